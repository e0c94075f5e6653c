use serde::Serialize;

/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// 入力デバイス情報
///
/// ホストが報告するデバイス一覧の1エントリ。
/// `index` はホストの列挙順で、操作者がデバイスを指定するときの番号になる。
///
/// # Examples
///
/// ```
/// # use mic_transcribe::types::DeviceInfo;
/// let info = DeviceInfo {
///     index: 2,
///     name: "USB Microphone".to_string(),
///     input_channels: 1,
/// };
/// assert_eq!(info.input_channels, 1);
/// ```
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// ホストの列挙順のデバイス番号
    pub index: usize,

    /// デバイス名
    pub name: String,

    /// 入力チャンネル数
    ///
    /// 0 のデバイスは録音に使えない
    pub input_channels: u16,
}

/// 抽出済みの文字起こし
///
/// 認識APIのレスポンスから抽出ポリシーに従って取り出したテキスト。
/// 少なくとも1つのトランスクリプトを含むことが保証される。
///
/// # Examples
///
/// ```
/// # use mic_transcribe::types::Transcription;
/// let transcription = Transcription {
///     transcripts: vec!["hola mundo".to_string()],
///     language: Some("es-AR".to_string()),
/// };
/// assert_eq!(transcription.joined_text(), "hola mundo");
/// ```
#[derive(Clone, Debug)]
pub struct Transcription {
    /// 抽出されたトランスクリプト（抽出順）
    pub transcripts: Vec<String>,

    /// APIが検出した言語コード
    ///
    /// レスポンスに含まれない場合は None
    pub language: Option<String>,
}

impl Transcription {
    /// 全トランスクリプトを改行で連結したテキストを返す
    pub fn joined_text(&self) -> String {
        self.transcripts.join("\n")
    }
}

/// 永続化する文字起こしレコード
///
/// データベースのコレクションに追加されるJSONの形そのまま。
///
/// # JSON出力例
///
/// ```json
/// {
///   "text": "hola mundo",
///   "language": "es-AR",
///   "timestamp": "2025-01-02T14:30:15+00:00"
/// }
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct TranscriptionRecord {
    /// 文字起こしテキスト（複数トランスクリプトは改行連結済み）
    pub text: String,

    /// 言語コード
    pub language: String,

    /// ISO 8601形式のタイムスタンプ
    pub timestamp: String,
}

/// 永続化するエラーレコード
#[derive(Clone, Debug, Serialize)]
pub struct ErrorRecord {
    /// エラーメッセージ
    pub error: String,

    /// ISO 8601形式のタイムスタンプ
    pub timestamp: String,
}

/// 現在時刻のISO 8601タイムスタンプを生成
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
