//! Text access for chat-style inputs.

use std::sync::Arc;

/// An input that carries plain text.
///
/// Lets text matchers stay generic over the concrete input type, so the same
/// matcher works for a bare `String` and for a richer message struct.
///
/// ```rust,ignore
/// fn mentions<S: TextInput>(word: &'static str) -> impl Fn(S) -> Eventual<Option<Scored<()>>> {
///     move |input: S| Eventual::ready(input.text().contains(word).then(|| Scored::bare(1.0)))
/// }
/// ```
pub trait TextInput {
    fn text(&self) -> &str;
}

impl TextInput for str {
    fn text(&self) -> &str {
        self
    }
}

impl TextInput for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

impl TextInput for Arc<str> {
    fn text(&self) -> &str {
        self
    }
}

impl TextInput for Box<str> {
    fn text(&self) -> &str {
        self
    }
}

impl<T: TextInput + ?Sized> TextInput for &T {
    fn text(&self) -> &str {
        (**self).text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shout<S: TextInput>(input: S) -> String {
        input.text().to_uppercase()
    }

    #[test]
    fn test_text_of_common_inputs() {
        assert_eq!(shout("next"), "NEXT");
        assert_eq!(shout(String::from("back")), "BACK");
        assert_eq!(shout(Arc::<str>::from("start")), "START");
        assert_eq!(shout(Box::<str>::from("repeat")), "REPEAT");
        assert_eq!(shout(&String::from("again")), "AGAIN");
    }
}
