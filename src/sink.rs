use crate::config::{Config, SinkMode};
use crate::store::TranscriptStore;
use crate::types::{now_timestamp, Transcription};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// 文字起こし出力先の共通トレイト
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// 文字起こしを出力
    async fn publish(&self, transcription: &Transcription) -> Result<()>;

    /// 実行失敗をベストエフォートで報告
    async fn report_error(&self, message: &str) -> Result<()>;

    /// シンク名を取得
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn TranscriptSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptSink")
            .field("name", &self.name())
            .finish()
    }
}

/// 標準出力への表示
pub struct StdoutSink;

#[async_trait]
impl TranscriptSink for StdoutSink {
    async fn publish(&self, transcription: &Transcription) -> Result<()> {
        println!("\n=== 文字起こし結果 ===");
        for transcript in &transcription.transcripts {
            println!("{}", transcript);
        }
        println!("{}", "=".repeat(50));
        Ok(())
    }

    async fn report_error(&self, _message: &str) -> Result<()> {
        // エラーは呼び出し側が標準エラーに表示済み
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Firebase Realtime Database への転送
pub struct StoreSink {
    store: TranscriptStore,
    /// レスポンスに言語コードがなかったときに使う言語
    fallback_language: String,
}

impl StoreSink {
    pub fn new(store: TranscriptStore, fallback_language: String) -> Self {
        Self {
            store,
            fallback_language,
        }
    }
}

#[async_trait]
impl TranscriptSink for StoreSink {
    async fn publish(&self, transcription: &Transcription) -> Result<()> {
        let text = transcription.joined_text();
        let language = transcription
            .language
            .clone()
            .unwrap_or_else(|| self.fallback_language.clone());

        let key = self
            .store
            .record_transcription(&text, &language, &now_timestamp())
            .await?;
        log::info!("文字起こしレコードを追加しました: {}", key);

        Ok(())
    }

    async fn report_error(&self, message: &str) -> Result<()> {
        let key = self.store.record_error(message, &now_timestamp()).await?;
        log::info!("エラーレコードを追加しました: {}", key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}

/// 設定からシンクを構築
pub fn create_sink(config: &Config) -> Result<Box<dyn TranscriptSink>> {
    match config.sink.mode {
        SinkMode::Stdout => Ok(Box::new(StdoutSink)),
        SinkMode::Firebase => {
            let firebase = config
                .firebase
                .as_ref()
                .context("sink.mode = \"firebase\" には [firebase] 設定が必要です")?;
            let store = TranscriptStore::new(firebase)?;
            Ok(Box::new(StoreSink::new(
                store,
                config.recognize.language_code.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FirebaseConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> TranscriptStore {
        TranscriptStore::new(&FirebaseConfig {
            database_url: server.uri(),
            secret_file: None,
            transcript_collection: "transcriptions".to_string(),
            error_collection: "errors".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_create_sink_stdout() {
        let config = Config::default();
        let sink = create_sink(&config).unwrap();
        assert_eq!(sink.name(), "stdout");
    }

    #[test]
    fn test_create_sink_firebase_requires_config() {
        let mut config = Config::default();
        config.sink.mode = SinkMode::Firebase;

        let err = create_sink(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("[firebase]"));
    }

    #[test]
    fn test_create_sink_firebase() {
        let mut config = Config::default();
        config.sink.mode = SinkMode::Firebase;
        config.firebase = Some(FirebaseConfig {
            database_url: "https://myapp.firebaseio.com".to_string(),
            secret_file: None,
            transcript_collection: "transcriptions".to_string(),
            error_collection: "errors".to_string(),
        });

        let sink = create_sink(&config).unwrap();
        assert_eq!(sink.name(), "firebase");
    }

    #[tokio::test]
    async fn test_stdout_sink_publish() {
        let transcription = Transcription {
            transcripts: vec!["hola mundo".to_string()],
            language: Some("es-AR".to_string()),
        };

        let sink = StdoutSink;
        assert!(sink.publish(&transcription).await.is_ok());
        assert!(sink.report_error("なにかの失敗").await.is_ok());
    }

    #[tokio::test]
    async fn test_store_sink_publishes_joined_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/transcriptions.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "-N1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sink = StoreSink::new(store_for(&server), "es-AR".to_string());
        let transcription = Transcription {
            transcripts: vec!["primera".to_string(), "segunda".to_string()],
            language: Some("es-419".to_string()),
        };

        sink.publish(&transcription).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["text"], "primera\nsegunda");
        assert_eq!(body["language"], "es-419");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_store_sink_falls_back_to_configured_language() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/transcriptions.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "-N1"})),
            )
            .mount(&server)
            .await;

        let sink = StoreSink::new(store_for(&server), "es-AR".to_string());
        let transcription = Transcription {
            transcripts: vec!["hola".to_string()],
            language: None,
        };

        sink.publish(&transcription).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["language"], "es-AR");
    }

    #[tokio::test]
    async fn test_store_sink_reports_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/errors.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "-Nerr"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sink = StoreSink::new(store_for(&server), "es-AR".to_string());
        sink.report_error("音声認識リクエストに失敗: HTTP 403")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["error"], "音声認識リクエストに失敗: HTTP 403");
    }
}
