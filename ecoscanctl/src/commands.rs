use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use ecoscan_config::ClientConfig;
use ecoscan_config::loader::{BASE_URL_VAR, CONFIG_PATH_VAR};
use ecoscan_core::model::{
    ChatRequest, Credentials, ProfileUpdate, ScanAnalysis, ScanOutcome,
    SignupRequest, TaskId,
};
use ecoscan_core::{
    ApiClient, AspectRatio, CancellationToken, CapturePipeline, CropRegion,
    ScanService, SnapshotFrameSource,
};
use tracing::{info, warn};

use crate::cli::{Cli, Command, CropArgs, HistoryAction, ProfileAction, ScanArgs};

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;

    if let Command::Crop {
        image,
        crop,
        output,
    } = &cli.command
    {
        return crop_locally(&config, image, crop, output).await;
    }

    let client = ApiClient::from_config(&config.server)
        .context("creating backend client")?;

    match &cli.command {
        Command::Login => {
            let credentials = credentials(&cli)?;
            let reply = client.login(&credentials).await;
            println!("{}", reply.message);
            return Ok(exit_code(reply.success));
        }
        Command::Signup { email } => {
            let credentials = credentials(&cli)?;
            let reply = client
                .signup(&SignupRequest {
                    username: credentials.username,
                    email: email.clone(),
                    password: credentials.password,
                })
                .await;
            println!("{}", reply.message);
            return Ok(exit_code(reply.success));
        }
        _ => {}
    }

    // The session only lives in this process, so log in first when asked.
    if cli.username.is_some() {
        let reply = client.login(&credentials(&cli)?).await;
        if !reply.success {
            bail!("login failed: {}", reply.message);
        }
        info!("logged in");
    }

    match cli.command {
        Command::Scan(args) => scan(&config, client, args).await,
        Command::Poll { task_id, json } => {
            let service = ScanService::from_config(client, &config.scan);
            let cancel = cancel_on_ctrl_c();
            let outcome = service.poll_task(TaskId::new(task_id), &cancel).await;
            print_outcome(&outcome, json)
        }
        Command::Logout => Ok(exit_code(client.logout().await)),
        Command::Profile { action } => profile(&client, action).await,
        Command::History { action } => history(&client, action).await,
        Command::Chat { query, context } => {
            let reply = client.chat(&ChatRequest { query, context }).await;
            println!("{reply}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Crop { .. } | Command::Login | Command::Signup { .. } => {
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config_path = cli.config.as_ref().map(|p| p.display().to_string());
    let base_url = cli.base_url.clone();
    let lookup = move |key: &str| match key {
        CONFIG_PATH_VAR if config_path.is_some() => config_path.clone(),
        BASE_URL_VAR if base_url.is_some() => base_url.clone(),
        _ => std::env::var(key).ok(),
    };

    let load = ClientConfig::load_with(lookup, Path::new("."))
        .context("loading configuration")?;
    info!(
        source = ?load.source,
        base_url = %load.config.server.base_url,
        "configuration loaded"
    );
    Ok(load.config)
}

fn credentials(cli: &Cli) -> Result<Credentials> {
    let username = cli
        .username
        .clone()
        .ok_or_else(|| anyhow!("--username (or ECOSCAN_USERNAME) is required"))?;
    let password = cli
        .password
        .clone()
        .ok_or_else(|| anyhow!("--password (or ECOSCAN_PASSWORD) is required"))?;
    Ok(Credentials { username, password })
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Token that fires on Ctrl-C so an in-flight scan can stop cleanly.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling scan");
            token.cancel();
        }
    });
    cancel
}

fn apply_crop(pipeline: &mut CapturePipeline, args: &CropArgs) -> Result<()> {
    let Some(rect) = args.crop else {
        return Ok(());
    };
    pipeline.begin_crop()?;
    let region = match args.display {
        Some((width, height)) => {
            pipeline.update_crop_from_display(rect, width, height, args.zoom)?
        }
        None => pipeline.update_crop(CropRegion {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            zoom: args.zoom,
            aspect: AspectRatio::Free,
        })?,
    };
    info!(?region, "applying crop");
    let cropped = pipeline.commit_crop()?;
    let (width, height) = cropped.dimensions().as_u32_tuple();
    info!(width, height, "crop rendered");
    Ok(())
}

async fn crop_locally(
    config: &ClientConfig,
    image: &Path,
    args: &CropArgs,
    output: &Path,
) -> Result<ExitCode> {
    if args.crop.is_none() {
        bail!("--crop X,Y,W,H is required");
    }
    let mut pipeline = CapturePipeline::from_config(&config.scan);
    pipeline.load_from_file(image).await?;
    apply_crop(&mut pipeline, args)?;
    let final_image = pipeline.finalize()?;
    tokio::fs::write(output, final_image.bytes())
        .await
        .with_context(|| format!("writing {}", output.display()))?;
    let (width, height) = final_image.dimensions().as_u32_tuple();
    println!("{} ({width}x{height})", output.display());
    Ok(ExitCode::SUCCESS)
}

async fn scan(
    config: &ClientConfig,
    client: ApiClient,
    args: ScanArgs,
) -> Result<ExitCode> {
    let mut pipeline = CapturePipeline::from_config(&config.scan);
    if let Some(snapshot) = &args.camera_snapshot {
        pipeline.select_camera(Box::new(SnapshotFrameSource::new(snapshot)));
        pipeline.capture_from_camera_async().await?;
    } else if let Some(path) = &args.image {
        pipeline.select_upload();
        pipeline.load_from_file(path).await?;
    } else {
        bail!("an image path or --camera-snapshot is required");
    }

    apply_crop(&mut pipeline, &args.crop)?;
    let image = pipeline.finalize()?.clone();

    let service = ScanService::from_config(client, &config.scan);
    let cancel = cancel_on_ctrl_c();
    let outcome = service.submit_scan(&image, &cancel).await;
    print_outcome(&outcome, args.json)
}

fn print_outcome(outcome: &ScanOutcome, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(exit_code(outcome.is_success()));
    }

    let data = match outcome.data() {
        Some(data) => data,
        None => {
            eprintln!("{}", outcome.message().unwrap_or_default());
            return Ok(ExitCode::FAILURE);
        }
    };

    match ScanAnalysis::from_value(data) {
        Ok(analysis) => {
            println!("{}", analysis.product_name());
            if let Some(verdict) = analysis.verdict() {
                println!("  verdict:      {verdict}");
            }
            if let Some(score) = analysis.health_score {
                println!("  health score: {score}/100");
            }
            if let Some(score) = analysis.eco_score {
                println!("  eco score:    {score}/100");
            }
            if !analysis.detected_allergens.is_empty() {
                println!("  allergens:    {}", analysis.detected_allergens.join(", "));
            }
            for note in &analysis.notes {
                println!("  - {note}");
            }
        }
        Err(err) => {
            warn!(%err, "result is not a standard analysis, printing raw");
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn profile(client: &ApiClient, action: ProfileAction) -> Result<ExitCode> {
    let profile = client
        .get_profile()
        .await
        .ok_or_else(|| anyhow!("could not load profile (are you logged in?)"))?;

    match action {
        ProfileAction::Show => {
            println!("{}", profile.username);
            println!("  diet type:            {}", profile.diet_type);
            println!("  health conditions:    {}", profile.health_conditions);
            println!("  allergies:            {}", profile.allergies);
            println!("  ingredients to avoid: {}", profile.ingredients_to_avoid);
            Ok(ExitCode::SUCCESS)
        }
        ProfileAction::Update {
            health_conditions,
            allergies,
            diet_type,
            ingredients_to_avoid,
        } => {
            let current = ProfileUpdate::from(&profile);
            let update = ProfileUpdate {
                health_conditions: health_conditions
                    .unwrap_or(current.health_conditions),
                allergies: allergies.unwrap_or(current.allergies),
                diet_type: diet_type.unwrap_or(current.diet_type),
                ingredients_to_avoid: ingredients_to_avoid
                    .unwrap_or(current.ingredients_to_avoid),
            };
            let reply = client.update_profile(&update).await;
            println!("{}", reply.message);
            Ok(exit_code(reply.success))
        }
    }
}

async fn history(client: &ApiClient, action: HistoryAction) -> Result<ExitCode> {
    match action {
        HistoryAction::List { json } => {
            let outcome = client.get_history().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(exit_code(outcome.is_success()));
            }
            let entries = match outcome.into_result() {
                Ok(entries) => entries,
                Err(message) => {
                    eprintln!("{message}");
                    return Ok(ExitCode::FAILURE);
                }
            };
            if entries.is_empty() {
                println!("no scans yet");
            }
            let score = |s: Option<f64>| s.map_or_else(|| "-".to_string(), |s| s.to_string());
            for entry in entries {
                println!(
                    "{:>5}  {}  {:<32}  health {:>3}  eco {:>3}",
                    entry.id,
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.product_name,
                    score(entry.health_score),
                    score(entry.eco_score),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        HistoryAction::Clear => {
            let reply = client.clear_history().await;
            println!("{}", reply.message);
            Ok(exit_code(reply.success))
        }
    }
}
