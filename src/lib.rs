//! mic-transcribe - マイク音声のワンショット文字起こしツール
//!
//! このクレートは、マイクから固定時間の録音を行い、Google Speech-to-Text
//! で文字起こしして結果を出力するツールを提供します。
//!
//! # 主な機能
//!
//! - **デバイス自動選択**: マイクらしい名前の入力デバイスを優先して選択
//! - **固定時間録音**: チャンク単位で音声を収集してWAVファイルに保存
//! - **Google Speech-to-Text連携**: Base64エンコードした音声をREST APIで認識
//! - **Firebase連携**: 文字起こしとエラーをRealtime Databaseに追記（任意）
//!
//! # アーキテクチャ
//!
//! ```text
//! [Microphone] → [Recorder] → [output.wav]
//!                                  ↓
//!                            [SpeechClient]
//!                                  ↓
//!                          [extract_transcripts]
//!                                  ↓
//!                           [TranscriptSink]
//!                            ┌─────┴─────┐
//!                            │           │
//!                        [Stdout]   [Firebase]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use mic_transcribe::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod recognize;
pub mod recorder;
pub mod sink;
pub mod store;
pub mod types;
