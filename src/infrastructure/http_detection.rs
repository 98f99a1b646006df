/// HTTP検出クライアントアダプタ
///
/// リモート検出APIへmultipartで画像を送信し、構造化結果へ変換する。
/// 認証情報（licenseId）は構築時に注入された設定値から毎回付与される。
///
/// # ワイヤ契約
/// - リクエスト: multipart form（`image` パート任意、`licenseId` と
///   `returnDocument` は固定フィールド）
/// - レスポンス: JSON `{ "code": "OK" | "ERROR", "imageDocument": <base64>? }`
/// - 非2xxステータス ⇒ Transportエラー（このクライアントはリトライしない）

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{
    ApiConfig, DetectionOutcome, DetectionPort, EncodedImage, ResponseCode, ScanError, ScanResult,
};

/// 検出APIレスポンスのワイヤ形式
#[derive(Debug, Deserialize)]
struct DetectDocumentResponse {
    code: ResponseCode,
    #[serde(rename = "imageDocument")]
    image_document: Option<String>,
}

/// HTTP検出クライアント
pub struct HttpDetectionClient {
    client: Client,
    endpoint: String,
    license_id: String,
    return_document: bool,
}

impl HttpDetectionClient {
    /// 設定から新しいクライアントを作成
    ///
    /// リクエストタイムアウトは `api.timeout_ms`。fire-and-forgetの
    /// スキャンモードでin-flight数が無制限に伸びないための上限になる。
    pub fn new(config: &ApiConfig) -> ScanResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ScanError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.detect_endpoint(),
            license_id: config.license_id.clone(),
            return_document: config.return_document,
        })
    }
}

impl DetectionPort for HttpDetectionClient {
    fn submit(&self, image: Option<&EncodedImage>) -> ScanResult<DetectionOutcome> {
        let mut form = Form::new()
            .text("licenseId", self.license_id.clone())
            .text("returnDocument", self.return_document.to_string());

        if let Some(encoded) = image {
            let part = Part::bytes(encoded.data.clone())
                .file_name("image.png")
                .mime_str("image/png")
                .map_err(|e| ScanError::Transport(format!("Invalid image part: {}", e)))?;
            form = form.part("image", part);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Transport(format!("HTTP status {}", status)));
        }

        let body: DetectDocumentResponse = response
            .json()
            .map_err(|e| ScanError::Transport(format!("Invalid response body: {}", e)))?;

        outcome_from_response(body)
    }
}

/// ワイヤ形式から構造化結果への変換（base64デコード込み）
fn outcome_from_response(body: DetectDocumentResponse) -> ScanResult<DetectionOutcome> {
    let document = match body.image_document {
        Some(encoded) => Some(BASE64.decode(encoded.as_bytes()).map_err(|e| {
            ScanError::Detection(format!("Invalid base64 document payload: {}", e))
        })?),
        None => None,
    };

    Ok(DetectionOutcome {
        code: body.code,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok_with_document() {
        let body: DetectDocumentResponse =
            serde_json::from_str(r#"{ "code": "OK", "imageDocument": "AAA=" }"#)
                .expect("整形式のはず");
        let outcome = outcome_from_response(body).expect("デコード成功のはず");

        assert_eq!(outcome.code, ResponseCode::Ok);
        // "AAA=" は2バイトのゼロにデコードされる
        assert_eq!(outcome.document.unwrap(), vec![0u8, 0]);
    }

    #[test]
    fn test_response_ok_without_document() {
        let body: DetectDocumentResponse =
            serde_json::from_str(r#"{ "code": "OK" }"#).expect("整形式のはず");
        let outcome = outcome_from_response(body).expect("デコード成功のはず");

        assert!(outcome.is_ok());
        assert!(outcome.document.is_none());
    }

    #[test]
    fn test_response_error() {
        let body: DetectDocumentResponse =
            serde_json::from_str(r#"{ "code": "ERROR" }"#).expect("整形式のはず");
        let outcome = outcome_from_response(body).expect("変換成功のはず");

        assert_eq!(outcome.code, ResponseCode::Error);
        assert!(outcome.document.is_none());
    }

    #[test]
    fn test_invalid_base64_is_detection_error() {
        let body: DetectDocumentResponse =
            serde_json::from_str(r#"{ "code": "OK", "imageDocument": "!!not-base64!!" }"#)
                .expect("整形式のはず");
        let result = outcome_from_response(body);
        assert!(matches!(result, Err(ScanError::Detection(_))));
    }

    #[test]
    fn test_unknown_code_rejected() {
        let result: Result<DetectDocumentResponse, _> =
            serde_json::from_str(r#"{ "code": "MAYBE" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_construction() {
        let config = ApiConfig::default();
        let client = HttpDetectionClient::new(&config).expect("構築成功のはず");
        assert_eq!(
            client.endpoint,
            "https://demo.mobbeel.com/mobbscan/detectDocument.json"
        );
        assert!(client.return_document);
    }
}
