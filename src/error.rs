use thiserror::Error;

/// 1回の実行を中断させるエラーの分類
///
/// 実行は文字起こしを出力して成功するか、以下のいずれかで失敗するかの
/// どちらかになる。部分的な成功は存在しない。
#[derive(Debug, Error)]
pub enum RunError {
    /// 入力チャンネルを持つデバイスが1つも見つからない
    #[error("入力デバイスが見つかりません")]
    NoInputDevice,

    /// 録音でチャンクを1つも取得できなかった
    #[error("音声を取得できませんでした (マイクを確認してください)")]
    EmptyRecording,

    /// 録音ファイルが小さすぎてマイクが機能していない疑いがある
    #[error("録音ファイルが小さすぎます ({bytes} バイト < {min} バイト)、マイクが機能していない可能性があります")]
    RecordingTooSmall { bytes: u64, min: u64 },

    /// 音声認識APIの呼び出しに失敗した
    #[error("音声認識リクエストに失敗: {detail}")]
    Service { detail: String },

    /// 認識結果にトランスクリプトが1つも含まれない
    #[error("文字起こし結果がありません (音声品質を確認してください)")]
    NoResults,
}

impl RunError {
    /// ログ出力用の分類ラベル
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::NoInputDevice => "no_input_device",
            RunError::EmptyRecording => "empty_recording",
            RunError::RecordingTooSmall { .. } => "recording_too_small",
            RunError::Service { .. } => "service",
            RunError::NoResults => "no_results",
        }
    }
}
