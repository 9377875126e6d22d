//! Turns an ordered exchange history into display text. Pure functions of
//! their input; the caller replaces the display surface wholesale.

use crate::session::Exchange;

/// The echoed form of a submitted user line.
pub fn user_line(text: &str) -> String {
    format!("user:\n {}\n", text)
}

/// The display form of an assistant answer.
pub fn assistant_line(text: &str) -> String {
    format!("assistant:\n {}\n", text)
}

/// Full transcript of a history, in insertion order.
pub fn render(history: &[Exchange]) -> String {
    let mut out = String::new();
    for exchange in history {
        out.push_str(&user_line(&exchange.user_text));
        out.push_str(&assistant_line(&exchange.assistant_text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_render_single_exchange_format() {
        let history = vec![Exchange::new("2+2", "4")];
        assert_eq!(render(&history), "user:\n 2+2\nassistant:\n 4\n");
    }

    #[test]
    fn test_render_preserves_order() {
        let history = vec![
            Exchange::new("first", "one"),
            Exchange::new("second", "two"),
        ];
        let out = render(&history);
        let first = out.find("first").unwrap();
        let second = out.find("second").unwrap();
        assert!(first < second);
        assert_eq!(
            out,
            "user:\n first\nassistant:\n one\nuser:\n second\nassistant:\n two\n"
        );
    }

    #[test]
    fn test_render_is_pure() {
        let history = vec![Exchange::new("a", "b"), Exchange::new("c", "d")];
        assert_eq!(render(&history), render(&history));
    }

    #[test]
    fn test_multiline_answer_is_kept_verbatim() {
        let history = vec![Exchange::new("list", "1. a\n2. b")];
        assert_eq!(render(&history), "user:\n list\nassistant:\n 1. a\n2. b\n");
    }
}
