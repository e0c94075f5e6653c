use crate::config::AudioConfig;
use crate::error::RunError;
use crate::types::SampleI16;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Sample, SizedSample};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// 1チャンクの受信を待つ最大時間
///
/// チャンク自体は数十ミリ秒で届くが、ストリーム開始直後は
/// デバイスの立ち上がりで遅れることがある。
const CHUNK_RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// 録音チャンネルのバッファ容量（チャンク数）
const RECORDING_CHANNEL_CAPACITY: usize = 64;

/// 録音結果の統計情報
#[derive(Debug, Clone)]
pub struct RecordingStats {
    /// 取得したサンプル数
    pub samples: usize,
    /// 録音の実時間（秒）
    pub duration_seconds: f64,
    /// 書き出したWAVファイルのサイズ（バイト）
    pub artifact_bytes: u64,
}

/// 録音時間ぶんのチャンク読み取り回数を計算
///
/// 端数が出る場合は切り上げる。半端なチャンクも1回の読み取りとして
/// 数えないと、録音時間が指定より短くなるため。
///
/// # Examples
///
/// ```
/// # use mic_transcribe::recorder::chunk_count;
/// // 16kHz、1024サンプルのチャンクで5秒間 → 79回
/// assert_eq!(chunk_count(16000, 1024, 5), 79);
/// ```
pub fn chunk_count(sample_rate: u32, chunk_samples: u32, record_seconds: u32) -> usize {
    let total_samples = sample_rate as u64 * record_seconds as u64;
    total_samples.div_ceil(chunk_samples as u64) as usize
}

/// チャンネルから指定回数ぶんのチャンクを収集
///
/// ストリームが途中で閉じられた場合やタイムアウトした場合は、
/// そこまでに取得したサンプルを返す。録音の途中失敗で全体を
/// 落とさないための挙動。
pub async fn collect_chunks(
    rx: &mut mpsc::Receiver<Vec<SampleI16>>,
    total_chunks: usize,
    recv_timeout: Duration,
) -> Vec<SampleI16> {
    let mut samples = Vec::new();

    for read_index in 0..total_chunks {
        match timeout(recv_timeout, rx.recv()).await {
            Ok(Some(chunk)) => samples.extend_from_slice(&chunk),
            Ok(None) => {
                log::warn!(
                    "音声ストリームが閉じられました ({} / {} チャンク取得済み)",
                    read_index,
                    total_chunks
                );
                break;
            }
            Err(_) => {
                log::warn!(
                    "音声チャンクの読み取りがタイムアウト ({} / {} チャンク取得済み)",
                    read_index,
                    total_chunks
                );
                break;
            }
        }
    }

    samples
}

/// 録音結果の検証
///
/// チャンクを1つも取得できなかった場合はエラーを返す。
pub fn ensure_captured(samples: &[SampleI16]) -> Result<(), RunError> {
    if samples.is_empty() {
        return Err(RunError::EmptyRecording);
    }
    Ok(())
}

/// サンプルをWAVファイルに書き出し
///
/// 16ビットPCM形式で保存し、書き出したファイルのサイズを返す。
/// 既存のファイルは上書きされる。
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[SampleI16],
    sample_rate: u32,
    channels: u16,
) -> Result<u64> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)
        .with_context(|| format!("WAVファイルの作成に失敗: {:?}", path.as_ref()))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .with_context(|| "WAVファイルへのサンプル書き込みに失敗")?;
    }

    writer
        .finalize()
        .with_context(|| "WAVファイルのファイナライズに失敗")?;

    let artifact_bytes = std::fs::metadata(path.as_ref())
        .with_context(|| format!("WAVファイルのサイズ取得に失敗: {:?}", path.as_ref()))?
        .len();

    Ok(artifact_bytes)
}

/// マイクからの固定時間録音
pub struct Recorder {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
}

impl Recorder {
    /// 新しいRecorderを作成
    pub fn new(device: cpal::Device, config: &AudioConfig) -> Result<Self> {
        let default_config = device
            .default_input_config()
            .context("デフォルト入力設定が取得できません")?;

        log::info!(
            "デバイス設定: {:?}, {}Hz, {}ch",
            default_config.sample_format(),
            default_config.sample_rate().0,
            default_config.channels()
        );

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.chunk_samples),
        };

        Ok(Self {
            device,
            config: stream_config,
            sample_format: default_config.sample_format(),
        })
    }

    /// 固定時間の録音を実行してWAVファイルに保存
    ///
    /// ストリームを開いてチャンクを収集し、終わったらストリームを
    /// 解放してからファイルに書き出す。
    ///
    /// # Errors
    ///
    /// チャンクを1つも取得できなかった場合は `RunError::EmptyRecording`、
    /// ストリームの構築やファイルの書き込みに失敗した場合もエラーを返す。
    pub async fn record(&self, config: &AudioConfig) -> Result<RecordingStats> {
        let (tx, mut rx) = mpsc::channel::<Vec<SampleI16>>(RECORDING_CHANNEL_CAPACITY);

        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(tx)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(tx)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(tx)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(tx)?,
            _ => anyhow::bail!("サポートされていないサンプルフォーマット"),
        };

        stream.play().context("ストリームの再生開始に失敗")?;
        println!("\n{}秒間録音します... 話してください", config.record_seconds);

        let total_chunks = chunk_count(
            config.sample_rate,
            config.chunk_samples,
            config.record_seconds,
        );
        let samples = collect_chunks(&mut rx, total_chunks, CHUNK_RECV_TIMEOUT).await;

        // 次の処理に移る前にデバイスを解放する
        drop(stream);
        log::info!("音声入力ストリームを停止しました");

        ensure_captured(&samples)?;

        let artifact_bytes = write_wav(
            &config.output_path,
            &samples,
            config.sample_rate,
            config.channels,
        )?;

        let duration_seconds =
            samples.len() as f64 / (config.sample_rate as f64 * config.channels as f64);

        log::info!(
            "WAVファイル書き込み完了: {} ({}サンプル, {:.2}秒, {}バイト)",
            config.output_path,
            samples.len(),
            duration_seconds,
            artifact_bytes
        );

        Ok(RecordingStats {
            samples: samples.len(),
            duration_seconds,
            artifact_bytes,
        })
    }

    /// ストリームを構築
    fn build_stream<T>(&self, tx: mpsc::Sender<Vec<SampleI16>>) -> Result<cpal::Stream>
    where
        T: SizedSample + Sample + Send + 'static,
        <T as Sample>::Float: Into<f32>,
    {
        let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
            let mut chunk = Vec::with_capacity(data.len());
            for &sample in data {
                let f = sample.to_float_sample().into();
                let clamped = f.clamp(-1.0, 1.0);
                let i16_sample = (clamped * i16::MAX as f32) as SampleI16;
                chunk.push(i16_sample);
            }

            match tx.try_send(chunk) {
                Ok(_) => {
                    // 成功時はログ出力しない（コールバック内のため）
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("録音バッファへの送信失敗: バッファ満杯");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // 収集完了後に届いたチャンクは捨てる
                }
            }
        };

        let error_callback = move |err| {
            log::error!("音声ストリームエラー: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(&self.config, data_callback, error_callback, None)
            .context("入力ストリームの構築に失敗")?;

        Ok(stream)
    }
}
