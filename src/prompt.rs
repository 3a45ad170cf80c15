//! The fixed instruction prompt sent to the provider with every document.

const INSTRUCTIONS: &str = r#"以下のルールに従って、技術文書を読み上げ可能なアクセシブルな日本語に変換してください：

# Rules
1. 基本的に文書は原文ママで翻訳する。
2. 技術文書内のコードブロックは、「```Xxx 言語のコードブロック:
このコードブロックでは...」という書き出しでコードブロックの内容を文章で説明する内容に変換してマークダウン記法のバッククオートで囲む。元のコードブロックの挿入は変換後の文書には含めない。
3. 画像や図表は、「画像(or図表) {title} この画像は...」という書き出しで画像や図表の内容を文章で説明する内容に変換する。元の画像や図表の挿入は変換後の文書には含めない。
"#;

const DOCUMENT_MARKER: &str = "変換対象の文書:";

/// Render the conversion prompt for `document`.
///
/// The document is appended verbatim after the marker line, so headings and
/// prose reach the model byte-for-byte.
pub fn render(document: &str) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + document.len() + 32);
    prompt.push_str(INSTRUCTIONS);
    prompt.push('\n');
    prompt.push_str(DOCUMENT_MARKER);
    prompt.push('\n');
    prompt.push_str(document);
    prompt
}
