//! Terminal styling for the run output

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

use crate::config::PipelineConfig;

pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "");

pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("smogcast").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("traffic · weather · pollution → pm2.5").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the run configuration card
pub fn print_config(config: &PipelineConfig) {
    let weather = match &config.weather_dir {
        Some(dir) => truncate_path(dir, 40),
        None => format!("archive {}..={}", config.start_year, config.end_year),
    };
    println!("    {}", style("Configuration").cyan().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!("      {}Traffic:   {}", FOLDER, truncate_path(&config.traffic_path, 40));
    println!("      {}Weather:   {}", FOLDER, weather);
    println!("      {}Pollution: {}", FOLDER, truncate_path(&config.pollution_path, 40));
    println!(
        "      {}Target:    {} ({}, {})",
        TARGET,
        style(&config.target).yellow(),
        config.problem,
        config.algorithm
    );
    println!("      {}Output:    {}", SAVE, truncate_path(&config.output_dir, 40));
    println!();
}

pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {}{}", INFO, message);
}

pub fn print_warning(message: &str) {
    println!("    {}{}", WARN, style(message).yellow());
}

pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}{}",
        CLOCK,
        style(crate::report::format_duration(elapsed)).dim()
    );
}

pub fn print_completion(had_failures: bool) {
    println!();
    if had_failures {
        println!(
            "    {}{}",
            WARN,
            style("Run finished with skipped stages").yellow().bold()
        );
    } else {
        println!("    {}{}", ROCKET, style("Run complete!").green().bold());
    }
    println!();
}

pub fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("data/processed/merged.csv", 13), "...merged.csv");
    }
}
