use anyhow::{Context, Result};

use wordday::app::App;
use wordday::config::Config;

/// Print today's answer
pub async fn resolve(config: Config, force: bool, json: bool) -> Result<()> {
    let app = App::build(config).await?;

    let answer = if force {
        app.scheduler.force_refresh().await
    } else {
        app.resolver.resolve_today().await
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("Puzzle #{} ({})", answer.sequence_number, answer.date);
    println!("  Answer: {}", answer.word);
    println!("  Source: {}", answer.source);
    if !answer.is_authoritative {
        println!("  Note: no endpoint answered, this is the offline fallback");
    }
    Ok(())
}

/// Run one generation and store the articles
pub async fn generate(config: Config, word: Option<String>) -> Result<()> {
    let app = App::build(config).await?;

    let report = app
        .scheduler
        .trigger_manual_generation(word.as_deref())
        .await
        .context("Generation failed")?;

    println!(
        "Generated {} article(s) for {} (puzzle #{}, source: {})",
        report.items_stored, report.answer.word, report.answer.sequence_number, report.answer.source
    );
    for item in app.store.get_by_key(&report.answer.key()).await {
        println!("  [{}] {} ({})", item.category, item.title, item.id);
    }
    Ok(())
}

/// Print content store statistics
pub async fn stats(config: Config, json: bool) -> Result<()> {
    let app = App::build(config).await?;
    let stats = app.store.get_stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Content store");
    println!("{:-<40}", "");
    println!("Articles:  {}", stats.total_articles);
    println!("Retained:  {}", stats.retained_articles);
    println!("Keys:      {}", stats.distinct_keys);
    println!("Views:     {}", stats.total_views);
    println!("Likes:     {}", stats.total_likes);
    match stats.last_updated {
        Some(at) => println!("Updated:   {at}"),
        None => println!("Updated:   never"),
    }
    for (category, count) in &stats.per_category {
        println!("  {category}: {count}");
    }
    Ok(())
}

/// Drop every article and the snapshot file
pub async fn clear(config: Config, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to clear the content store without --yes");
    }

    let app = App::build(config).await?;
    let before = app.store.get_stats().await.total_articles;
    app.store.clear_all().await;

    println!("Cleared {before} article(s).");
    Ok(())
}
