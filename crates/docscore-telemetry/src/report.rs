//! Human-readable run reports

use crate::record::TrainingMetrics;
use std::fmt::Write;

/// Render a plain-text summary of one training run
pub fn render_summary(metrics: &TrainingMetrics) -> String {
    let mut out = String::new();
    let params = &metrics.model_params;
    let eval = &metrics.eval_metrics;

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Training Summary Report");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(out, "Model:    {}", metrics.model_id);
    let _ = writeln!(out, "Run:      {}", metrics.run_id);
    let _ = writeln!(out, "Finished: {}", metrics.finished_at.to_rfc3339());
    let _ = writeln!(out, "Duration: {} ms", metrics.duration_ms);

    let _ = writeln!(out, "\nModel Configuration:");
    let _ = writeln!(out, "- Learning Rate: {}", params.lr);
    let _ = writeln!(out, "- Epochs: {}", params.epoch);
    let _ = writeln!(out, "- Word N-grams: {}", params.word_ngrams);
    let _ = writeln!(out, "- Min Count: {}", params.min_count);
    let _ = writeln!(out, "- Loss: {}", params.loss.as_str());

    let _ = writeln!(out, "\nTraining Corpus:");
    let _ = writeln!(out, "- Positive: {}", metrics.corpus.positive);
    let _ = writeln!(out, "- Negative: {}", metrics.corpus.negative);

    if let (Some(first), Some(last)) = (metrics.train_loss.first(), metrics.train_loss.last()) {
        let _ = writeln!(out, "\nTraining Loss:");
        let _ = writeln!(out, "- First epoch: {:.4}", first);
        let _ = writeln!(out, "- Final epoch: {:.4}", last);
    }

    let _ = writeln!(out, "\nPerformance Metrics:");
    let _ = writeln!(out, "- Accuracy: {:.4}", eval.accuracy);
    let _ = writeln!(out, "- Average Confidence: {:.4}", eval.avg_confidence);
    let _ = writeln!(out, "- Precision: {:.4}", eval.precision());
    let _ = writeln!(out, "- Recall: {:.4}", eval.recall());
    let _ = writeln!(out, "- F1: {:.4}", eval.f1());
    let _ = writeln!(out, "- Test Samples: {}", eval.num_test_samples);

    if !eval.class_distribution.is_empty() {
        let _ = writeln!(out, "\nClass Distribution:");
        for (class, count) in &eval.class_distribution {
            let _ = writeln!(out, "- {}: {}", class, count);
        }
    }

    out
}

/// One line per run, oldest first
pub fn render_history(runs: &[TrainingMetrics]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<25}  {:>8}  {:>8}  {:>10}",
        "model_id", "finished_at", "accuracy", "samples", "final_loss"
    );
    for run in runs {
        let loss = run
            .final_loss()
            .map(|l| format!("{:.4}", l))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<36}  {:<25}  {:>8.4}  {:>8}  {:>10}",
            run.model_id,
            run.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
            run.eval_metrics.accuracy,
            run.eval_metrics.num_test_samples,
            loss
        );
    }
    out
}
