use std::path::{Path, PathBuf};

/// Writes a small BERT-style word-level `tokenizer.json` into `dir`.
///
/// Ids: [PAD]=0 [UNK]=1 [CLS]=101 [SEP]=102 [MASK]=103, then the review
/// vocabulary from 104 upwards.
pub fn write_tokenizer(dir: &Path) -> PathBuf {
    let mut vocab = serde_json::json!({
        "[PAD]": 0,
        "[UNK]": 1,
        "[CLS]": 101,
        "[SEP]": 102,
        "[MASK]": 103,
    });
    let words = [
        "this", "movie", "is", "absolutely", "fantastic", "!", "terrible", "plot", ".",
    ];
    for (offset, word) in words.iter().enumerate() {
        vocab[*word] = serde_json::json!(104 + offset);
    }

    let special = |id: u32, content: &str| {
        serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        })
    };

    let tokenizer = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(0, "[PAD]"),
            special(1, "[UNK]"),
            special(101, "[CLS]"),
            special(102, "[SEP]"),
            special(103, "[MASK]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 102],
            "cls": ["[CLS]", 101]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    });

    let path = dir.join("tokenizer.json");
    std::fs::write(&path, serde_json::to_string_pretty(&tokenizer).unwrap()).unwrap();
    path
}
