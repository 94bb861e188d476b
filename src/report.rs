//! Human-readable reports for the CLI

use std::fmt::Write as _;

use crate::eval::{LoopSummary, StopReason};
use crate::types::{RoundReport, StyleDescription};

/// Descriptions ordered by fitness, highest first. Equal fitness keeps
/// repository order.
pub fn rank(descriptions: &[StyleDescription]) -> Vec<&StyleDescription> {
    let mut ranked: Vec<&StyleDescription> = descriptions.iter().collect();
    ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    ranked
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

pub fn render_rankings(descriptions: &[StyleDescription]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "STYLE PROMPT RANKINGS ({} prompts)", descriptions.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>4}  {:>5}  {:>8}  {}", "rank", "index", "fitness", "file");

    for (rank, d) in rank(descriptions).into_iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:>5}  {:>+8.3}  {}",
            rank + 1,
            d.index,
            d.fitness,
            d.prompt_file
        );
        let _ = writeln!(out, "{:>21}{}", "", truncate(first_line(&d.text), 72));
    }
    out
}

pub fn print_rankings(descriptions: &[StyleDescription]) {
    print!("{}", render_rankings(descriptions));
}

pub fn print_round_report(report: &RoundReport) {
    println!("\nROUND: \"{}\" (topic: {})", report.post_title, report.probe_topic);
    println!("   Average likeness: {:.2}", report.average);
    if report.failures > 0 {
        println!("   Failed generations: {} (scored 0.0)", report.failures);
    }
    for a in &report.adjustments {
        println!(
            "   #{:<3} likeness {:.2}  {:+.2}  fitness {:.2} -> {:.2}",
            a.index + 1,
            a.likeness,
            a.delta,
            a.old_fitness,
            a.new_fitness
        );
    }
}

pub fn print_loop_summary(summary: &LoopSummary) {
    let reason = match summary.stop {
        StopReason::RoundLimitReached => "round limit reached",
        StopReason::ErrorBudgetExhausted => "too many consecutive failures",
    };
    println!("\nEVALUATION STOPPED: {reason}");
    println!("   Rounds completed: {}", summary.rounds_completed);
    println!("   Posts evaluated: {}", summary.posts_evaluated);
    println!("   Failed rounds: {}", summary.failed_rounds);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(index: usize, fitness: f64, text: &str) -> StyleDescription {
        StyleDescription {
            index,
            prompt_file: format!("prompt-{index}.txt"),
            text: text.into(),
            fitness,
        }
    }

    #[test]
    fn test_rank_orders_by_fitness_and_keeps_ties_stable() {
        let all = vec![d(0, 0.1, "a"), d(1, 0.9, "b"), d(2, 0.1, "c"), d(3, -1.0, "d")];
        let order: Vec<usize> = rank(&all).iter().map(|d| d.index).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_render_shows_first_line_of_text() {
        let all = vec![d(0, 0.25, "\nYou are a wry essayist.\nMore detail here.")];
        let out = render_rankings(&all);
        assert!(out.contains("+0.250"));
        assert!(out.contains("prompt-0.txt"));
        assert!(out.contains("You are a wry essayist."));
        assert!(!out.contains("More detail here."));
    }

    #[test]
    fn test_truncate_long_lines() {
        let long = "x".repeat(100);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 10), "short");
    }
}
