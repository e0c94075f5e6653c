use crate::config::FirebaseConfig;
use crate::types::{ErrorRecord, TranscriptionRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// push応答
///
/// コレクションへの追記に成功すると、採番されたキーが返る。
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Firebase Realtime Database への文字起こしレコードの追記
///
/// REST API経由でコレクションにレコードをPOSTする。既存データは
/// 上書きせず、常に追記になる。
pub struct TranscriptStore {
    client: reqwest::Client,
    database_url: String,
    auth: Option<String>,
    transcript_collection: String,
    error_collection: String,
}

impl TranscriptStore {
    /// 新しいTranscriptStoreを作成
    ///
    /// `secret_file` が設定されている場合は、その中身をデータベース
    /// シークレットとして読み込む。前後の空白と改行は取り除く。
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let auth = match &config.secret_file {
            Some(path) => {
                let secret = fs::read_to_string(path)
                    .with_context(|| format!("シークレットファイルの読み込みに失敗: {}", path))?;
                Some(secret.trim().to_string())
            }
            None => None,
        };

        let client = reqwest::Client::builder()
            .build()
            .context("データベース HTTPクライアント作成失敗")?;

        Ok(Self {
            client,
            database_url: config.database_url.trim_end_matches('/').to_string(),
            auth,
            transcript_collection: config.transcript_collection.clone(),
            error_collection: config.error_collection.clone(),
        })
    }

    /// 文字起こしレコードを追記
    ///
    /// 追加されたレコードのキーを返す。
    pub async fn record_transcription(
        &self,
        text: &str,
        language: &str,
        timestamp: &str,
    ) -> Result<String> {
        let record = TranscriptionRecord {
            text: text.to_string(),
            language: language.to_string(),
            timestamp: timestamp.to_string(),
        };
        self.push(&self.transcript_collection, &record).await
    }

    /// エラーレコードを追記
    pub async fn record_error(&self, message: &str, timestamp: &str) -> Result<String> {
        let record = ErrorRecord {
            error: message.to_string(),
            timestamp: timestamp.to_string(),
        };
        self.push(&self.error_collection, &record).await
    }

    /// レコードをコレクションにPOST
    async fn push<T: Serialize>(&self, collection: &str, record: &T) -> Result<String> {
        let url = format!("{}/{}.json", self.database_url, collection);

        let mut request = self.client.post(&url).json(record);
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth.as_str())]);
        }

        let response = request
            .send()
            .await
            .context("データベースへの送信失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("データベースエラー: {} - {}", status, error_text);
        }

        let push: PushResponse = response
            .json()
            .await
            .context("push応答のパース失敗")?;

        log::debug!("レコードを追加しました: {}/{}", collection, push.name);

        Ok(push.name)
    }
}
