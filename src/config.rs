use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recognize: RecognizeConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    pub firebase: Option<FirebaseConfig>,
}

/// オーディオ入力設定
///
/// マイクからの録音に関する設定。
///
/// # デフォルト値
///
/// - `device_id`: "auto" (マイクらしい名前のデバイスを自動選択)
/// - `sample_rate`: 16000 Hz (16kHz - Speech-to-Textの推奨値)
/// - `channels`: 1 (モノラル)
/// - `chunk_samples`: 1024 サンプル
/// - `record_seconds`: 5 秒
/// - `output_path`: "output.wav"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_chunk_samples")]
    pub chunk_samples: u32,
    #[serde(default = "default_record_seconds")]
    pub record_seconds: u32,
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

/// 抽出ポリシー
///
/// 認識レスポンスからトランスクリプトをどう取り出すかを指定する。
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// 全結果の全候補を抽出順に集める
    AllAlternatives,
    /// 最初の結果の最初の候補だけを使う
    FirstOnly,
}

/// Google Speech-to-Text 設定
///
/// 認識APIへのリクエストに関する設定。
///
/// # デフォルト値
///
/// - `endpoint`: Google Speech-to-Text v1 の recognize エンドポイント
/// - `language_code`: "es-AR" (アルゼンチンのスペイン語)
/// - `enable_automatic_punctuation`: true
/// - `model`: "default"
/// - `timeout_seconds`: 15 秒
/// - `extraction`: all_alternatives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecognizeConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Google Cloud API Key
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_recognize_language_code")]
    pub language_code: String,
    /// 追加で認識を試みる言語コード。空なら送信しない
    #[serde(default)]
    pub alternative_language_codes: Vec<String>,
    #[serde(default = "default_enable_automatic_punctuation")]
    pub enable_automatic_punctuation: bool,
    /// 認識モデル名。空文字列ならリクエストから除外する
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_extraction")]
    pub extraction: ExtractionPolicy,
}

/// 出力先の種類
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    /// 標準出力に表示する
    Stdout,
    /// Firebase Realtime Database に追記する
    Firebase,
}

/// 出力先設定
///
/// # デフォルト値
///
/// - `mode`: "stdout"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_mode")]
    pub mode: SinkMode,
}

/// Firebase Realtime Database 設定
///
/// `sink.mode = "firebase"` のときに必須になる。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FirebaseConfig {
    /// データベースのルートURL (例: "https://myapp.firebaseio.com")
    pub database_url: String,
    /// データベースシークレットを1行で格納したファイルのパス。省略可能
    pub secret_file: Option<String>,
    /// 文字起こしレコードの追記先コレクション
    #[serde(default = "default_transcript_collection")]
    pub transcript_collection: String,
    /// エラーレコードの追記先コレクション
    #[serde(default = "default_error_collection")]
    pub error_collection: String,
}

// Default functions
fn default_device_id() -> String {
    "auto".to_string()
}

fn default_sample_rate() -> u32 {
    16000 // 16kHz - Speech-to-Textの推奨値
}

fn default_channels() -> u16 {
    1
}

fn default_chunk_samples() -> u32 {
    1024
}

fn default_record_seconds() -> u32 {
    5
}

fn default_output_path() -> String {
    "output.wav".to_string()
}

fn default_endpoint() -> String {
    "https://speech.googleapis.com/v1/speech:recognize".to_string()
}

fn default_recognize_language_code() -> String {
    "es-AR".to_string()
}

fn default_enable_automatic_punctuation() -> bool {
    true
}

fn default_model() -> String {
    "default".to_string()
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_extraction() -> ExtractionPolicy {
    ExtractionPolicy::AllAlternatives
}

fn default_sink_mode() -> SinkMode {
    SinkMode::Stdout
}

fn default_transcript_collection() -> String {
    "transcriptions".to_string()
}

fn default_error_collection() -> String {
    "errors".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            recognize: RecognizeConfig::default(),
            sink: SinkConfig::default(),
            firebase: None, // デフォルトではFirebase設定なし
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            chunk_samples: default_chunk_samples(),
            record_seconds: default_record_seconds(),
            output_path: default_output_path(),
        }
    }
}

impl Default for RecognizeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            language_code: default_recognize_language_code(),
            alternative_language_codes: Vec::new(),
            enable_automatic_punctuation: default_enable_automatic_punctuation(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            extraction: default_extraction(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            mode: default_sink_mode(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use mic_transcribe::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    ///
    /// # Arguments
    ///
    /// * `path` - 出力先のパス
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use mic_transcribe::config::Config;
    /// Config::write_default("config.toml").unwrap();
    /// ```
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// 設定ファイルの存在を確認し、存在する場合は読み込み、
    /// 存在しない場合はデフォルト設定を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use mic_transcribe::config::Config;
    /// let config = Config::load_or_default("config.toml").unwrap();
    /// ```
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}
