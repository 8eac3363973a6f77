//! Text and JSON output for CLI results

use anyhow::Result;
use serde::Serialize;
use shelfscan_core::{Detection, ModelMetrics, StoreStats, TrainingRow, Video};

const NONE: &str = "-";

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_stats(stats: &StoreStats) {
    println!("Detection Store");
    println!("===============");
    println!("Detections:       {}", stats.total_detections);
    println!("Unique products:  {}", stats.unique_products);
    println!(
        "Videos:           {} ({} processed)",
        stats.total_videos, stats.processed_videos
    );

    if stats.category_stats.is_empty() {
        return;
    }

    println!();
    println!("By category:");
    let width = stats
        .category_stats
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, count) in &stats.category_stats {
        println!("  {:<width$}  {}", name, count, width = width);
    }
}

pub fn print_detections(detections: &[Detection]) {
    if detections.is_empty() {
        println!("No detections found.");
        return;
    }

    for d in detections {
        println!(
            "#{} {} video={} frame={} product={} category={} branch={} confidence={}",
            d.id,
            d.timestamp.format("%Y-%m-%d %H:%M:%S"),
            d.video_id,
            opt(d.frame_number),
            opt(d.product_id.as_deref()),
            opt(d.product_category.as_deref()),
            opt(d.location_branch.as_deref()),
            decimal(d.confidence, 2),
        );
    }
    println!("\n{} detection(s)", detections.len());
}

pub fn print_training_rows(rows: &[TrainingRow]) {
    if rows.is_empty() {
        println!("No groups met the sample threshold.");
        return;
    }

    for row in rows {
        println!(
            "{} dow={} hour={} branch={} product={} ({}) count={}",
            opt(row.date),
            opt(row.day_of_week),
            opt(row.hour_of_day),
            opt(row.location_branch.as_deref()),
            opt(row.product_id.as_deref()),
            opt(row.product_category.as_deref()),
            row.detection_count,
        );
    }
    println!("\n{} group(s)", rows.len());
}

pub fn print_videos(videos: &[Video]) {
    if videos.is_empty() {
        println!("No videos found.");
        return;
    }

    for v in videos {
        println!(
            "{} [{}] branch={} contributor={} frames={} uploaded={}",
            v.id,
            if v.processed { "processed" } else { "pending" },
            opt(v.branch_location.as_deref()),
            opt(v.contributor_id.as_deref()),
            opt(v.frame_count),
            v.upload_date
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| NONE.to_string()),
        );
    }
}

pub fn print_model_metrics(metrics: &[ModelMetrics]) {
    if metrics.is_empty() {
        println!("No model metrics recorded.");
        return;
    }

    for m in metrics {
        println!(
            "#{} {} trained {} accuracy={}",
            m.id,
            m.model_version,
            m.train_date.format("%Y-%m-%d %H:%M:%S"),
            decimal(m.accuracy, 4)
        );

        // Top features only; unknown weights sort last
        let mut features: Vec<_> = m.feature_importance.iter().collect();
        features.sort_by(|a, b| {
            let weight = |w: &Option<f64>| w.unwrap_or(f64::NEG_INFINITY);
            weight(b.1).total_cmp(&weight(a.1))
        });
        for (name, weight) in features.into_iter().take(5) {
            println!("    {}: {}", name, decimal(*weight, 3));
        }
    }
}

fn decimal(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_else(|| NONE.to_string())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NONE.to_string())
}
