//! JSON Schema + Markdown生成ツール
//!
//! src/domain/config.rsの設定構造から以下を自動生成します：
//! 1. JSON Schema (schema/config.json)
//! 2. Markdownドキュメント (CONFIGURATION.md)
//!
//! 実行方法:
//! ```
//! cargo run --bin generate_schema
//! ```

use docuscan::domain::config::AppConfig;
use schemars::schema_for;
use serde_json::{Map, Value};
use std::fs;

fn main() {
    println!("JSON Schema + Markdown生成中...");

    // AppConfigからJSON Schemaを生成
    let schema = schema_for!(AppConfig);

    let json = serde_json::to_string_pretty(&schema).expect("Failed to serialize schema to JSON");

    fs::create_dir_all("schema").expect("Failed to create schema/ directory");
    fs::write("schema/config.json", &json).expect("Failed to write schema/config.json");
    println!("  ✓ schema/config.json");

    let schema_value: Value =
        serde_json::from_str(&json).expect("Failed to parse generated schema");
    let markdown = generate_markdown(&schema_value);

    fs::write("CONFIGURATION.md", markdown).expect("Failed to write CONFIGURATION.md");
    println!("  ✓ CONFIGURATION.md");

    println!("✅ 生成完了: schema/config.json + CONFIGURATION.md");
}

/// JSON Schemaからマークダウンドキュメントを生成
fn generate_markdown(schema: &Value) -> String {
    let mut md = String::new();

    md.push_str("# 設定リファレンス (Configuration Reference)\n\n");

    md.push_str("## 概要\n\n");
    md.push_str("`config.toml`ファイルは、docuscanの動作を制御する設定ファイルです。\n\n");
    md.push_str("**設定ファイルの場所**: `config.toml` (プロジェクトルート)  \n");
    md.push_str("**スキーマファイル**: `schema/config.json` (自動生成)\n\n");

    md.push_str("⚠️ **注意**: このドキュメント（CONFIGURATION.md）は `cargo run --bin generate_schema` で自動生成されます。\n");
    md.push_str("設定項目の説明を変更する場合は、`src/domain/config.rs`のdoc commentsを編集してください。\n\n");

    md.push_str("## 設定ファイルの読み込み\n\n");
    md.push_str("- `config.toml`が存在する場合: ファイルから読み込み\n");
    md.push_str("- ファイルが存在しない場合: デフォルト値を使用（警告ログ出力）\n\n");

    md.push_str("## 設定項目\n\n");

    let defs = schema
        .get("$defs")
        .and_then(|d| d.as_object())
        .cloned()
        .unwrap_or_default();

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, prop) in props {
            generate_section(&mut md, key, prop, &defs);
        }
    }

    md
}

/// セクション（[api] / [capture]）ごとの項目テーブルを生成
fn generate_section(md: &mut String, key: &str, schema: &Value, defs: &Map<String, Value>) {
    md.push_str(&format!("### [{}] - {}\n\n", key, section_name(key)));

    // $refの場合は定義を解決してからテーブル化
    let resolved = schema
        .get("$ref")
        .and_then(|r| r.as_str())
        .and_then(|r| r.strip_prefix("#/$defs/"))
        .and_then(|name| defs.get(name))
        .unwrap_or(schema);

    if let Some(desc) = resolved.get("description").and_then(|d| d.as_str()) {
        md.push_str(&format!("{}\n\n", desc));
    }

    let props = match resolved.get("properties").and_then(|p| p.as_object()) {
        Some(props) if !props.is_empty() => props,
        _ => return,
    };

    md.push_str("| 設定項目 | 型 | デフォルト | 説明 |\n");
    md.push_str("|---------|-----|---------|---------|\n");

    for (prop_key, prop_schema) in props {
        md.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            prop_key,
            type_string(prop_schema),
            default_value(prop_schema),
            description(prop_schema)
        ));
    }
    md.push('\n');
}

fn type_string(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(type_str)) => match type_str.as_str() {
            "integer" | "number" => schema
                .get("format")
                .and_then(|f| f.as_str())
                .unwrap_or(type_str)
                .to_string(),
            "boolean" => "bool".to_string(),
            other => other.to_string(),
        },
        _ => "unknown".to_string(),
    }
}

fn default_value(schema: &Value) -> String {
    match schema.get("default") {
        Some(Value::String(s)) => format!("`\"{}\"`", s),
        Some(Value::Number(n)) => format!("`{}`", n),
        Some(Value::Bool(b)) => format!("`{}`", b),
        _ => "-".to_string(),
    }
}

fn description(schema: &Value) -> String {
    schema
        .get("description")
        .and_then(|d| d.as_str())
        .map(|s| s.replace("\n\n", "<br><br>").replace('\n', " ").replace('|', "\\|"))
        .unwrap_or_else(|| "-".to_string())
}

fn section_name(key: &str) -> String {
    match key {
        "api" => "検出API設定".to_string(),
        "capture" => "キャプチャ設定".to_string(),
        _ => key.to_string(),
    }
}
