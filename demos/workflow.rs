use rstyle::{
    logger, ApiClient, Config, ImageRef, PreferenceField, Preferences, WorkflowController,
};
use std::env;
use std::fs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(logger::LoggerConfig::from_env())?;
    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found");
    }

    let api_url = env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let photo = env::args()
        .nth(1)
        .ok_or("usage: cargo run --example workflow -- <photo path or URL>")?;

    let image = if photo.starts_with("http://") || photo.starts_with("https://") {
        photo
    } else {
        ImageRef::from_bytes(&fs::read(&photo)?, None).to_string()
    };

    // POLL_MAX_ATTEMPTS, POLL_INTERVAL_MS and POLL_DEADLINE_MS tune the wait.
    let policy = Config::from_env().poll;
    let mut workflow = WorkflowController::new(ApiClient::new(api_url)?).with_policy(policy);

    workflow.start()?;
    workflow.upload(image)?;
    workflow.set_preferences(
        Preferences::new()
            .with(PreferenceField::Length, "medium")
            .with(PreferenceField::Occasion, "work"),
    )?;

    let recommendations = workflow.fetch_recommendations().await?;
    for style in recommendations {
        println!("{:>3}  {}: {}", style.id, style.name, style.description);
    }
    let Some(first) = recommendations.first().map(|style| style.id.clone()) else {
        return Err("no recommendations returned".into());
    };

    let session = workflow.select(&first).await?;
    println!("step:    {}", session.step);
    println!("outcome: {:?}", session.outcome);
    println!(
        "result:  {}",
        session.result_image.as_deref().unwrap_or("(none)")
    );

    Ok(())
}
