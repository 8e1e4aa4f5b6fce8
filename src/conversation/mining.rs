//! Contact-info mining (spec §4.3.1): scan user-authored messages newest
//! first for a phone, email, and name. Mined fields are persisted once and
//! never overwrite an already-stored value.

use regex::Regex;
use std::sync::LazyLock;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})(?:[^\d]|$)").unwrap()
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

static INTRO_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:my name is|i am|i'm|this is|call me)\s+([A-Z][a-zA-Z'-]{1,20})\b").unwrap()
});

static NAME_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][a-zA-Z'-]{1,20})\s+\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

const STOP_WORDS: &[&str] = &[
    "just", "not", "here", "interested", "looking", "wondering", "trying", "calling",
    "texting", "messaging", "hi", "hello", "hey", "sorry", "yes", "no",
];

#[derive(Debug, Default, Clone)]
pub struct MinedContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Extracts digits from the first phone-shaped match. `messages` must already
/// be ordered newest-first and filtered to user-authored content.
pub fn mine(messages: &[&str]) -> MinedContact {
    let mut mined = MinedContact::default();

    for text in messages {
        if mined.phone.is_none()
            && let Some(caps) = PHONE_RE.captures(text)
        {
            let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() == 10 {
                mined.phone = Some(digits);
            }
        }
        if mined.email.is_none()
            && let Some(m) = EMAIL_RE.find(text)
        {
            mined.email = Some(m.as_str().to_lowercase());
        }
        if mined.phone.is_some() && mined.email.is_some() && mined.name.is_some() {
            break;
        }
    }

    // Name, priority (a): co-occurs with a phone number in the same message.
    for text in messages {
        if let Some(caps) = NAME_PHONE_RE.captures(text) {
            let candidate = caps[1].to_string();
            if !is_stop_word(&candidate) {
                mined.name = Some(candidate);
                break;
            }
        }
    }

    // Priority (b): introductory phrase.
    if mined.name.is_none() {
        for text in messages {
            if let Some(caps) = INTRO_NAME_RE.captures(text) {
                let candidate = caps[1].to_string();
                if !is_stop_word(&candidate) {
                    mined.name = Some(candidate);
                    break;
                }
            }
        }
    }

    mined
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mines_name_phone_email_across_messages() {
        let messages = ["my email is riley@x.ca", "Riley 6048334967"];
        let mined = mine(&messages);
        assert_eq!(mined.phone.as_deref(), Some("6048334967"));
        assert_eq!(mined.email.as_deref(), Some("riley@x.ca"));
        assert_eq!(mined.name.as_deref(), Some("Riley"));
    }

    #[test]
    fn intro_phrase_is_used_when_no_name_phone_pair_exists() {
        let messages = ["I'm Jordan, just browsing"];
        let mined = mine(&messages);
        assert_eq!(mined.name.as_deref(), Some("Jordan"));
    }

    #[test]
    fn rejects_stop_words_as_names() {
        let messages = ["hi there, just looking"];
        let mined = mine(&messages);
        assert_eq!(mined.name, None);
    }

    #[test]
    fn formatted_phone_normalizes_to_digits() {
        let messages = ["call me at (604) 833-4967 anytime"];
        let mined = mine(&messages);
        assert_eq!(mined.phone.as_deref(), Some("6048334967"));
    }
}
