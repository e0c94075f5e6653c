use crate::config::AudioConfig;
use crate::error::RunError;
use crate::types::DeviceInfo;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use regex_lite::Regex;

/// 選択された入力デバイス
///
/// cpalのデバイスハンドルと表示用の情報をまとめて持つ。
pub struct SelectedDevice {
    pub device: cpal::Device,
    pub info: DeviceInfo,
}

/// 入力デバイスを選択
///
/// `device_id` が "auto" の場合はマイクらしい名前のデバイスを優先して
/// 自動選択する。デバイス名が指定されている場合は完全一致で検索する。
///
/// # Errors
///
/// 入力チャンネルを持つデバイスが1つもない場合は `RunError::NoInputDevice`、
/// 指定された名前のデバイスが見つからない場合はエラーを返す。
pub fn select_input_device(config: &AudioConfig) -> Result<SelectedDevice> {
    let candidates = enumerate_input_devices()?;

    if config.device_id != "auto" {
        // デバイス名が指定されている場合は、デバイス一覧から検索
        let selected = candidates
            .into_iter()
            .find(|(_, info)| info.name == config.device_id)
            .with_context(|| format!("デバイスが見つかりません: {}", config.device_id))?;
        log::info!("入力デバイス: {}", selected.1.name);
        return Ok(SelectedDevice {
            device: selected.0,
            info: selected.1,
        });
    }

    // 操作者がデバイス番号を確認できるように一覧を表示する
    println!("\n利用可能な入力デバイス:");
    for (_, info) in &candidates {
        println!("  [{}] {} ({}ch)", info.index, info.name, info.input_channels);
    }

    let infos: Vec<DeviceInfo> = candidates.iter().map(|(_, info)| info.clone()).collect();
    let chosen = pick_device(&infos).ok_or(RunError::NoInputDevice)?.clone();

    let selected = candidates
        .into_iter()
        .find(|(_, info)| info.index == chosen.index)
        .ok_or(RunError::NoInputDevice)?;

    log::info!("デバイスを自動選択: [{}] {}", chosen.index, chosen.name);

    Ok(SelectedDevice {
        device: selected.0,
        info: selected.1,
    })
}

/// デバイス選択ポリシー
///
/// 名前に "mic" を含むデバイス（大文字小文字を区別しない。"Microphone" も
/// 部分一致で拾う）を優先し、なければ最初の入力可能なデバイスを返す。
/// 入力チャンネルが 0 のデバイスは候補にしない。
pub fn pick_device(devices: &[DeviceInfo]) -> Option<&DeviceInfo> {
    let mic_name = Regex::new("(?i)mic").unwrap();

    let mut first_capable = None;
    for device in devices.iter().filter(|d| d.input_channels > 0) {
        if mic_name.is_match(&device.name) {
            return Some(device);
        }
        if first_capable.is_none() {
            first_capable = Some(device);
        }
    }

    if first_capable.is_some() {
        log::info!("マイクらしい名前のデバイスがないため、最初の入力デバイスを使用します");
    }
    first_capable
}

/// 入力チャンネルを持つデバイスを列挙
///
/// デバイス番号はホストの列挙順をそのまま使う。入力設定が取得できない
/// デバイス（出力専用など）は候補から外す。
fn enumerate_input_devices() -> Result<Vec<(cpal::Device, DeviceInfo)>> {
    let host = cpal::default_host();
    let mut candidates = Vec::new();

    for (index, device) in host
        .devices()
        .context("オーディオデバイスの列挙に失敗")?
        .enumerate()
    {
        let name = match device.name() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let input_channels = device
            .default_input_config()
            .map(|c| c.channels())
            .unwrap_or(0);

        if input_channels > 0 {
            candidates.push((
                device,
                DeviceInfo {
                    index,
                    name,
                    input_channels,
                },
            ));
        }
    }

    Ok(candidates)
}

/// デバイス一覧を表示
///
/// `--show-interfaces` フラグで呼ばれる。各デバイスのサポートする
/// フォーマットも合わせて表示する。
pub fn print_input_devices() -> Result<()> {
    println!("利用可能な入力デバイス:");
    println!();

    for (device, info) in enumerate_input_devices()? {
        println!("  [{}] {} ({}ch)", info.index, info.name, info.input_channels);

        device.supported_input_configs()?.for_each(|config_range| {
            println!(
                "      フォーマット: {:?}, {}-{}Hz, {}ch",
                config_range.sample_format(),
                config_range.min_sample_rate().0,
                config_range.max_sample_rate().0,
                config_range.channels()
            );
        });
        println!();
    }

    Ok(())
}
