use anyhow::Result;
use env_logger::Env;
use mic_transcribe::config::Config;
use mic_transcribe::error::RunError;
use mic_transcribe::sink::{create_sink, TranscriptSink};
use mic_transcribe::{device, pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // デバイス一覧表示モード
    if args.len() > 1 && args[1] == "--show-interfaces" {
        device::print_input_devices()?;
        return Ok(());
    }

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    log::info!("mic-transcribe を起動します");
    if config.recognize.api_key.is_empty() {
        log::warn!("APIキーが設定されていません (recognize.api_key)");
    }

    println!("=== 音声認識テスト ===");

    let sink = create_sink(&config)?;
    log::info!("シンク: {}", sink.name());

    match pipeline::run(&config, sink.as_ref()).await {
        Ok(_) => {
            log::info!("mic-transcribe を終了しました");
            Ok(())
        }
        Err(err) => {
            report_failure(&err, sink.as_ref()).await;
            std::process::exit(1);
        }
    }
}

/// 失敗の内容を表示し、ベストエフォートでシンクに報告する
async fn report_failure(err: &anyhow::Error, sink: &dyn TranscriptSink) {
    match err.downcast_ref::<RunError>() {
        Some(run_err) => log::error!("実行失敗 ({}): {:#}", run_err.kind(), err),
        None => log::error!("予期しないエラー: {:#}", err),
    }

    eprintln!("\nエラー: {:#}", err);
    print_troubleshooting();

    // エラー報告の失敗は終了コードに影響させない
    if let Err(report_err) = sink.report_error(&format!("{:#}", err)).await {
        log::warn!("エラーレコードの送信に失敗: {:#}", report_err);
    }
}

/// トラブルシューティングのチェックリストを表示
fn print_troubleshooting() {
    println!("\nトラブルシューティング:");
    println!("1. 他のアプリケーションでマイクが動作するか確認する");
    println!("2. マイクに近づいて大きめの声で話す");
    println!("3. APIキーの権限を確認する");
    println!("4. 録音されたWAVファイルを再生して確認する");
    println!("5. 別のマイク (デバイス番号) を試す");
}
