use crate::config::{ExtractionPolicy, RecognizeConfig};
use crate::error::RunError;
use crate::types::Transcription;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 音声エンコーディング
///
/// 録音は16ビットPCMのWAVなので固定。
const AUDIO_ENCODING: &str = "LINEAR16";

/// recognizeリクエストの認識設定
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_language_codes: Vec<String>,
    pub enable_automatic_punctuation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// recognizeリクエストの音声データ
#[derive(Debug, Serialize)]
struct RecognitionAudio {
    /// Base64エンコード済みのWAVバイト列
    content: String,
}

/// recognizeリクエスト本体
#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

/// recognizeレスポンス
///
/// 認識できる音声がなかった場合、APIは `results` フィールド自体を
/// 省略するので、欠落を空のVecとして扱う。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
}

/// 1発話ぶんの認識結果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// 認識候補
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionAlternative {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Google Speech-to-Text クライアント
pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    request_config: RecognitionConfig,
}

impl SpeechClient {
    /// 新しいSpeechClientを作成
    ///
    /// `sample_rate` は録音時のサンプリングレートをそのまま渡す。
    /// `timeout` が None の場合、リクエストは無期限に待つ。
    pub fn new(
        config: &RecognizeConfig,
        sample_rate: u32,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("Speech-to-Text HTTPクライアント作成失敗")?;

        let request_config = RecognitionConfig {
            encoding: AUDIO_ENCODING.to_string(),
            sample_rate_hertz: sample_rate,
            language_code: config.language_code.clone(),
            alternative_language_codes: config.alternative_language_codes.clone(),
            enable_automatic_punctuation: config.enable_automatic_punctuation,
            model: if config.model.is_empty() {
                None
            } else {
                Some(config.model.clone())
            },
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// WAVバイト列を文字起こし
    ///
    /// 音声をBase64エンコードしてrecognizeエンドポイントにPOSTする。
    ///
    /// # Errors
    ///
    /// リクエストの送信失敗、非2xxレスポンス、レスポンスのパース失敗は
    /// いずれも `RunError::Service` を返す。
    pub async fn recognize(&self, wav_bytes: &[u8]) -> Result<RecognizeResponse> {
        let request = self.build_request(wav_bytes);

        log::info!(
            "音声認識リクエストを送信します ({} バイト)",
            wav_bytes.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RunError::Service {
                detail: format!("リクエスト送信失敗: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RunError::Service {
                detail: format!("HTTP {} - {}", status, error_text),
            }
            .into());
        }

        let parsed: RecognizeResponse =
            response.json().await.map_err(|e| RunError::Service {
                detail: format!("レスポンスパース失敗: {}", e),
            })?;

        log::debug!(
            "APIレスポンス: {}",
            serde_json::to_string_pretty(&parsed).unwrap_or_default()
        );
        log::info!("認識結果: {} 件", parsed.results.len());

        Ok(parsed)
    }

    /// リクエスト本体を構築
    fn build_request(&self, wav_bytes: &[u8]) -> RecognizeRequest {
        RecognizeRequest {
            config: self.request_config.clone(),
            audio: RecognitionAudio {
                content: BASE64.encode(wav_bytes),
            },
        }
    }
}

/// レスポンスからトランスクリプトを抽出
///
/// `AllAlternatives` は全結果の全候補を抽出順に集める。`FirstOnly` は
/// 最初の結果の最初の候補だけを使う。言語コードはレスポンスに含まれる
/// 最初のものを採用する。
///
/// # Errors
///
/// 結果が空、またはトランスクリプトを1つも取り出せなかった場合は
/// `RunError::NoResults` を返す。
pub fn extract_transcripts(
    response: &RecognizeResponse,
    policy: ExtractionPolicy,
) -> Result<Transcription, RunError> {
    let transcription = match policy {
        ExtractionPolicy::AllAlternatives => {
            let transcripts: Vec<String> = response
                .results
                .iter()
                .flat_map(|result| result.alternatives.iter())
                .map(|alternative| alternative.transcript.clone())
                .collect();
            let language = response
                .results
                .iter()
                .find_map(|result| result.language_code.clone());
            Transcription {
                transcripts,
                language,
            }
        }
        ExtractionPolicy::FirstOnly => match response.results.first() {
            Some(result) => {
                let transcripts = result
                    .alternatives
                    .first()
                    .map(|alternative| vec![alternative.transcript.clone()])
                    .unwrap_or_default();
                Transcription {
                    transcripts,
                    language: result.language_code.clone(),
                }
            }
            None => Transcription {
                transcripts: Vec::new(),
                language: None,
            },
        },
    };

    if transcription.transcripts.is_empty() {
        return Err(RunError::NoResults);
    }

    Ok(transcription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String) -> RecognizeConfig {
        RecognizeConfig {
            endpoint,
            api_key: "test-key".to_string(),
            ..RecognizeConfig::default()
        }
    }

    fn response_with(results: serde_json::Value) -> RecognizeResponse {
        serde_json::from_value(serde_json::json!({ "results": results })).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let config = test_config("http://localhost/v1/speech:recognize".to_string());
        let client = SpeechClient::new(&config, 16000, None).unwrap();

        let request = client.build_request(b"abc");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["config"]["encoding"], "LINEAR16");
        assert_eq!(body["config"]["sampleRateHertz"], 16000);
        assert_eq!(body["config"]["languageCode"], "es-AR");
        assert_eq!(body["config"]["enableAutomaticPunctuation"], true);
        assert_eq!(body["config"]["model"], "default");
        assert_eq!(body["audio"]["content"], BASE64.encode(b"abc"));

        // 空のフィールドはリクエストに含めない
        assert!(body["config"]
            .as_object()
            .unwrap()
            .get("alternativeLanguageCodes")
            .is_none());
    }

    #[test]
    fn test_request_body_includes_alternative_languages() {
        let mut config = test_config("http://localhost/v1/speech:recognize".to_string());
        config.alternative_language_codes = vec!["en-US".to_string(), "pt-BR".to_string()];
        let client = SpeechClient::new(&config, 16000, None).unwrap();

        let body = serde_json::to_value(client.build_request(b"abc")).unwrap();
        assert_eq!(
            body["config"]["alternativeLanguageCodes"],
            serde_json::json!(["en-US", "pt-BR"])
        );
    }

    #[test]
    fn test_request_body_omits_empty_model() {
        let mut config = test_config("http://localhost/v1/speech:recognize".to_string());
        config.model = String::new();
        let client = SpeechClient::new(&config, 16000, None).unwrap();

        let body = serde_json::to_value(client.build_request(b"abc")).unwrap();
        assert!(body["config"].as_object().unwrap().get("model").is_none());
    }

    #[test]
    fn test_parse_response_without_results_field() {
        // 認識できる音声がないとAPIはresultsを省略する
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_extract_all_alternatives_across_results() {
        let response = response_with(serde_json::json!([
            {"alternatives": [{"transcript": "primera"}], "languageCode": "es-AR"},
            {"alternatives": [{"transcript": "segunda"}, {"transcript": "tercera"}]}
        ]));

        let transcription =
            extract_transcripts(&response, ExtractionPolicy::AllAlternatives).unwrap();

        assert_eq!(transcription.transcripts, vec!["primera", "segunda", "tercera"]);
        assert_eq!(transcription.language.as_deref(), Some("es-AR"));
    }

    #[test]
    fn test_extract_first_only() {
        let response = response_with(serde_json::json!([
            {
                "alternatives": [
                    {"transcript": "hola mundo", "confidence": 0.92},
                    {"transcript": "ola mundo"}
                ],
                "languageCode": "es-AR"
            },
            {"alternatives": [{"transcript": "ignorada"}]}
        ]));

        let transcription = extract_transcripts(&response, ExtractionPolicy::FirstOnly).unwrap();

        assert_eq!(transcription.transcripts, vec!["hola mundo"]);
        assert_eq!(transcription.language.as_deref(), Some("es-AR"));
    }

    #[test]
    fn test_extract_empty_results_is_error() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();

        let err = extract_transcripts(&response, ExtractionPolicy::AllAlternatives).unwrap_err();
        assert!(matches!(err, RunError::NoResults));

        let err = extract_transcripts(&response, ExtractionPolicy::FirstOnly).unwrap_err();
        assert!(matches!(err, RunError::NoResults));
    }

    #[test]
    fn test_extract_results_without_alternatives_is_error() {
        let response = response_with(serde_json::json!([
            {"alternatives": []},
            {"alternatives": []}
        ]));

        let err = extract_transcripts(&response, ExtractionPolicy::AllAlternatives).unwrap_err();
        assert!(matches!(err, RunError::NoResults));
    }

    #[tokio::test]
    async fn test_recognize_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/speech:recognize"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "alternatives": [{"transcript": "hola mundo"}],
                        "languageCode": "es-AR"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(format!("{}/v1/speech:recognize", server.uri()));
        let client = SpeechClient::new(&config, 16000, Some(Duration::from_secs(15))).unwrap();

        let wav_bytes = b"RIFF fake wav payload";
        let response = client.recognize(wav_bytes).await.unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(
            response.results[0].alternatives[0].transcript,
            "hola mundo"
        );
        assert_eq!(
            response.results[0].language_code.as_deref(),
            Some("es-AR")
        );

        // 送信されたリクエスト本体を確認
        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["config"]["encoding"], "LINEAR16");
        assert_eq!(body["config"]["sampleRateHertz"], 16000);
        assert_eq!(body["audio"]["content"], BASE64.encode(wav_bytes));
    }

    #[tokio::test]
    async fn test_recognize_http_error_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"error": {"message": "API key not valid"}}"#),
            )
            .mount(&server)
            .await;

        let config = test_config(format!("{}/v1/speech:recognize", server.uri()));
        let client = SpeechClient::new(&config, 16000, None).unwrap();

        let err = client.recognize(b"RIFF").await.unwrap_err();
        let run_err = err.downcast_ref::<RunError>().unwrap();

        match run_err {
            RunError::Service { detail } => {
                assert!(detail.contains("403"));
                assert!(detail.contains("API key not valid"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recognize_rejects_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/v1/speech:recognize", server.uri()));
        let client = SpeechClient::new(&config, 16000, None).unwrap();

        let err = client.recognize(b"RIFF").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::Service { .. })
        ));
    }
}
