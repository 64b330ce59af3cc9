//! Prompt assembly and `{word}` placeholder handling.

use wordtutor_core::Message;

/// Placeholder substituted with the session's active word.
pub const WORD_PLACEHOLDER: &str = "{word}";

/// Built-in tutoring instructions.
pub const SYSTEM_PROMPT_TEMPLATE: &str = "你是一位专业的英语单词学习助手，当前学习单词为“{word}”。
【对话规则】
- 首次进入时，只输出：同学你好，针对单词“{word}”，还有什么想要了解的，我可以为你详细讲解哦~你也可以点击对话框上方的选项来进行提问。不要输出释义、用法、搭配等内容。
- 用户输入的内容如果不是“{word}”，无论是其他英文单词还是其他内容，都只回复：咱们还是专注于“{word}”这个单词吧，你在这个单词上还有什么疑问吗？
- 只有当用户输入“{word}”时，才输出该单词的简明中文释义，并以“你理解这个意思了吗？”结尾。例如：“这个单词的意思是‘男孩’，你理解这个意思了吗？”
- 用户输入“详细用法”时，只输出1~2种常见用法，举例说明，并以“你理解了吗？”结尾，不要输出多余拓展。
- 用户输入“固定搭配”时，只列举常见搭配，举例说明，并以“你记住这个搭配了吗？”结尾。
- 用户输入“词根词缀”时，只说明有无词根词缀，简要解释，并以“现在你理解了吗？”结尾。
- 用户输入“例句”时，只输出1个例句，并以“你能理解这个例句中‘{word}’的用法吗？”结尾。
- 用户输入“选择题”或“出一道选择题”时，只设计一道选择题，并以“请选择A、B或C。你能找出正确答案吗？”结尾。
- 用户输入A/B/C时，只判断正误并回复。

【输出要求】
- 只允许输出纯文本、结构化简明内容，禁止输出任何 markdown、表格、代码块、分点说明、mermaid、emoji、拓展知识、文化背景等。
- 每次回复只聚焦用户当前问题，不要重复输出全部知识点。
- 欢迎语只输出一次，后续不再重复。";

/// The greeting line the instructions ask for on session start.
pub const GREETING_TEMPLATE: &str =
    "同学你好，针对单词“{word}”，还有什么想要了解的，我可以为你详细讲解哦~你也可以点击对话框上方的选项来进行提问。";

/// Replace every `{word}` in `text`.
pub fn fill_placeholder(text: &str, word: &str) -> String {
    text.replace(WORD_PLACEHOLDER, word)
}

pub fn render_greeting(word: &str) -> String {
    fill_placeholder(GREETING_TEMPLATE, word)
}

/// The message list sent to the model for one request. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            template: SYSTEM_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom instruction template. `None` if it lacks `{word}`.
    pub fn with_template(template: impl Into<String>) -> Option<Self> {
        let template = template.into();
        template.contains(WORD_PLACEHOLDER).then_some(Self { template })
    }

    pub fn system_prompt(&self, word: &str) -> String {
        fill_placeholder(&self.template, word)
    }

    /// System instructions for `word`, then `history` in order, then
    /// `user_text` as a user turn. An empty `user_text` marks session start
    /// and adds no trailing turn.
    pub fn build(&self, word: &str, history: &[Message], user_text: &str) -> PromptPayload {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt(word)));
        messages.extend(history.iter().cloned());
        if !user_text.is_empty() {
            messages.push(Message::user(user_text));
        }
        PromptPayload { messages }
    }
}

/// Streaming `{word}` substitution.
///
/// Chunks may split a placeholder anywhere, so a trailing fragment that could
/// still become `{word}` is held back until the next chunk or [`finish`].
///
/// [`finish`]: PlaceholderFilter::finish
pub struct PlaceholderFilter {
    word: String,
    pending: String,
}

impl PlaceholderFilter {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            pending: String::new(),
        }
    }

    /// Feed one chunk; returns the text that is safe to relay now.
    pub fn push(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        let mut ready = fill_placeholder(&std::mem::take(&mut self.pending), &self.word);
        let hold = partial_placeholder_suffix(&ready);
        self.pending = ready.split_off(ready.len() - hold);
        ready
    }

    /// Flush whatever is held back.
    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }
}

/// Length of the longest proper prefix of `{word}` that `text` ends with.
fn partial_placeholder_suffix(text: &str) -> usize {
    (1..WORD_PLACEHOLDER.len())
        .rev()
        .find(|&k| text.ends_with(&WORD_PLACEHOLDER[..k]))
        .unwrap_or(0)
}
