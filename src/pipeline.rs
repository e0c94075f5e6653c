use crate::config::{Config, SinkMode};
use crate::device;
use crate::error::RunError;
use crate::recognize::{extract_transcripts, SpeechClient};
use crate::recorder::Recorder;
use crate::sink::TranscriptSink;
use crate::types::Transcription;
use anyhow::{Context, Result};
use std::time::Duration;

/// 有効な録音とみなす最小のWAVファイルサイズ（バイト）
pub const MIN_ARTIFACT_BYTES: u64 = 1024;

/// 録音ファイルのサイズ検証
///
/// 標準出力モードでは、このサイズに満たない録音をマイク不良として
/// 拒否する。Firebaseモードでは検証しない。
pub fn validate_artifact_size(artifact_bytes: u64, mode: SinkMode) -> Result<(), RunError> {
    if mode == SinkMode::Stdout && artifact_bytes < MIN_ARTIFACT_BYTES {
        return Err(RunError::RecordingTooSmall {
            bytes: artifact_bytes,
            min: MIN_ARTIFACT_BYTES,
        });
    }
    Ok(())
}

/// 認識リクエストのタイムアウトを決定
fn request_timeout(config: &Config) -> Option<Duration> {
    match config.sink.mode {
        SinkMode::Stdout => Some(Duration::from_secs(config.recognize.timeout_seconds)),
        // TODO: firebaseモードのリクエストにもタイムアウトを設定する
        SinkMode::Firebase => None,
    }
}

/// 録音から出力までを順番に実行
///
/// デバイス選択、録音、認識、出力の各ステージは前のステージの完了後に
/// 開始する。録音デバイスは認識リクエストを送る前に解放される。
///
/// # Errors
///
/// いずれかのステージの失敗で実行全体が失敗する。分類できる失敗は
/// `RunError` としてエラーチェーンに残る。
pub async fn run(config: &Config, sink: &dyn TranscriptSink) -> Result<Transcription> {
    let selected = device::select_input_device(&config.audio)?;

    let recorder = Recorder::new(selected.device, &config.audio)?;
    let stats = recorder.record(&config.audio).await?;

    validate_artifact_size(stats.artifact_bytes, config.sink.mode)?;

    let wav_bytes = std::fs::read(&config.audio.output_path).with_context(|| {
        format!("録音ファイルの読み込みに失敗: {}", config.audio.output_path)
    })?;

    let client = SpeechClient::new(
        &config.recognize,
        config.audio.sample_rate,
        request_timeout(config),
    )?;
    let response = client.recognize(&wav_bytes).await?;
    let transcription = extract_transcripts(&response, config.recognize.extraction)?;

    sink.publish(&transcription)
        .await
        .context("文字起こしの出力に失敗")?;

    Ok(transcription)
}
