use super::types::Message;

/// Append-only display log of a conversation. Never truncated within a session.
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<Message>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut transcript = ChatTranscript::new();
        transcript.append(Message::user("one"));
        transcript.append(Message::assistant("two"));
        transcript.append(Message::user("three"));

        let texts: Vec<&str> = transcript.messages().iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(transcript.last().map(|m| m.text()), Some("three"));
    }

    #[test]
    fn test_clear() {
        let mut transcript = ChatTranscript::new();
        transcript.append(Message::user("hello"));
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
