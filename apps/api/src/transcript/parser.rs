//! Transcript Parser: turns a normalized transcript into ordered Q&A pairs.
//!
//! Single pass over the non-empty lines. An AI turn closes the pending pair
//! (when it has an answer) and may open a new question; Student turns are
//! accumulated into the answer for the open question. Lines without a
//! recognised speaker label are ignored.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use crate::models::evaluation::QuestionAnswerPair;

/// AI lines longer than this are trimmed down to the sentence that asks.
const LONG_QUESTION_CHARS: usize = 200;

/// Sentences kept when a long line asks something no single sentence matches.
const TRAILING_SENTENCES: usize = 2;

fn re_ai_turn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:AI|bot|assistant):\s*(.+)$").unwrap())
}

fn re_student_turn() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:Student|user):\s*(.+)$").unwrap())
}

fn question_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            // interrogatives
            r"(?i)\b(what|how|why|when|where|which|who|whom|whose)\b",
            // modal requests
            r"(?i)\b(can|could|would|will)\s+you\b",
            // directives
            r"(?i)\b(explain|describe|define|tell\s+me|give\s+me|list|name)\b",
            // existential / confirmation
            r"(?i)\b(is\s+it|are\s+there|do\s+you|does\s+it|have\s+you|has\s+it)\b",
        ])
        .unwrap()
    })
}

enum Turn<'a> {
    Ai(&'a str),
    Student(&'a str),
}

fn classify(line: &str) -> Option<Turn<'_>> {
    if let Some(caps) = re_ai_turn().captures(line) {
        return caps.get(1).map(|m| Turn::Ai(m.as_str().trim()));
    }
    re_student_turn()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| Turn::Student(m.as_str().trim()))
}

/// Whether `text` asks something: a literal `?` or any question pattern.
pub fn contains_question(text: &str) -> bool {
    text.contains('?') || question_patterns().is_match(text)
}

/// The question actually being asked in an AI turn.
///
/// Short turns are used whole. Long turns usually open with framing remarks
/// and ask last, so the last question-bearing sentence is taken, falling back
/// to the trailing sentences.
pub fn extract_question(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= LONG_QUESTION_CHARS {
        return text.to_string();
    }

    let sentences = split_sentences(text);
    if let Some(question) = sentences.iter().rev().find(|s| contains_question(s)) {
        return question.to_string();
    }

    let keep = sentences.len().saturating_sub(TRAILING_SENTENCES);
    sentences[keep..].join(" ")
}

/// Splits on `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = text[start..idx + c.len_utf8()].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = next_idx;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

pub fn parse(transcript: &str) -> Vec<QuestionAnswerPair> {
    let mut pairs: Vec<QuestionAnswerPair> = Vec::new();
    let mut current_question: Option<String> = None;
    let mut current_answer = String::new();
    let mut previous_was_ai = false;

    let mut emit = |question: &str, answer: &mut String| {
        pairs.push(QuestionAnswerPair {
            question_number: pairs.len() as u32 + 1,
            question: question.to_string(),
            answer: answer.trim().to_string(),
        });
        answer.clear();
    };

    for line in transcript.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify(line) {
            Some(Turn::Ai(text)) => {
                if let Some(question) = current_question.as_deref() {
                    if !current_answer.is_empty() {
                        emit(question, &mut current_answer);
                    }
                }

                if contains_question(text) {
                    current_question = Some(extract_question(text));
                    current_answer.clear();
                } else if !previous_was_ai {
                    current_question = None;
                }
                previous_was_ai = true;
            }
            Some(Turn::Student(text)) => {
                if current_question.is_some() {
                    if !current_answer.is_empty() {
                        current_answer.push(' ');
                    }
                    current_answer.push_str(text);
                }
                previous_was_ai = false;
            }
            None => {}
        }
    }

    if let Some(question) = current_question.as_deref() {
        if !current_answer.is_empty() {
            emit(question, &mut current_answer);
        }
    }

    pairs
}
