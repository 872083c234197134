//! Command line arguments and the resolved run configuration.

use crate::corpus::CorpusConfig;
use crate::plot::{OutputPolicy, PlotStyle};
use crate::topic::NmfConfig;
use clap::Parser;
use std::path::PathBuf;

/// Bibliometric literature review pipeline.
#[derive(Debug, Clone, Parser)]
#[command(name = "litreview")]
#[command(about = "Merge, filter, refine and analyze bibliographic exports")]
#[command(version)]
pub struct Cli {
    /// Directory holding ieee.csv, springer.csv, zotero.bib and exclude.ris
    /// [default: ./data, relative to the working directory]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Save figures to the output directory instead of displaying them
    #[arg(long)]
    pub save_plots: bool,

    /// Directory receiving saved figures
    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Keyword selecting the relevant topic
    #[arg(long, default_value = "travel")]
    pub topic_keyword: String,

    /// Scopus API key used for metadata refinement
    #[arg(long, env = "SCOPUS_API_KEY", hide_env_values = true)]
    pub scopus_api_key: Option<String>,

    /// Topic weight a document must exceed to be relevant
    #[arg(long, default_value_t = 0.2, value_parser = parse_threshold)]
    pub relevance_threshold: f64,

    /// TTF/OTF font used for figure text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    if (0.0..1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("{} is outside [0, 1)", threshold))
    }
}

/// Fixed parameters of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Figure size in inches
    pub figure_size: (f32, f32),
    /// Bars in ranked histograms
    pub bar_limit: usize,
    /// Bars in the source histogram split by relevance
    pub grouped_source_limit: usize,
    /// Bars in the word distribution
    pub word_limit: usize,
    pub max_network_edges: usize,
    pub save_dpi: u32,
    pub display_dpi: u32,
    pub cloud_columns: usize,
    pub cloud_words: usize,
    /// Documents listed as best matches of the relevant topic
    pub best_documents: usize,
    /// Smallest source shown in the relevance ratio table
    pub min_source_documents: usize,
    pub corpus: CorpusConfig,
    pub nmf: NmfConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            figure_size: (12.0, 8.0),
            bar_limit: 15,
            grouped_source_limit: 25,
            word_limit: 50,
            max_network_edges: 500,
            save_dpi: 300,
            display_dpi: 100,
            cloud_columns: 5,
            cloud_words: 10,
            best_documents: 10,
            min_source_documents: 5,
            corpus: CorpusConfig::default(),
            nmf: NmfConfig::default(),
        }
    }
}

/// Resolved, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub save_plots: bool,
    pub topic_keyword: String,
    pub scopus_api_key: Option<String>,
    pub relevance_threshold: f64,
    pub font: Option<PathBuf>,
    pub settings: PipelineSettings,
}

/// The `data` directory of the working directory.
pub fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            data_dir: cli.data_dir.unwrap_or_else(default_data_dir),
            output_dir: cli.output_dir,
            save_plots: cli.save_plots,
            topic_keyword: cli.topic_keyword,
            scopus_api_key: cli.scopus_api_key.filter(|key| !key.trim().is_empty()),
            relevance_threshold: cli.relevance_threshold,
            font: cli.font,
            settings: PipelineSettings::default(),
        }
    }
}

impl Config {
    pub fn output_policy(&self) -> OutputPolicy {
        if self.save_plots {
            OutputPolicy::Save {
                dir: self.output_dir.clone(),
            }
        } else {
            OutputPolicy::Display
        }
    }

    /// Figure style for the output mode, without text.
    pub fn plot_style(&self) -> PlotStyle {
        let (width, height) = self.settings.figure_size;
        let dpi = if self.save_plots {
            self.settings.save_dpi
        } else {
            self.settings.display_dpi
        };
        PlotStyle::default().with_size(width, height).with_dpi(dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_argument_defaults() {
        let cli = Cli::try_parse_from(["litreview"]).unwrap();
        assert_eq!(cli.data_dir, None);
        assert!(!cli.save_plots);
        assert_eq!(cli.output_dir, PathBuf::from("results"));
        assert_eq!(cli.topic_keyword, "travel");
        assert_eq!(cli.relevance_threshold, 0.2);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_config_resolution() {
        let cli = Cli::try_parse_from([
            "litreview",
            "--save-plots",
            "--output-dir",
            "out",
            "--topic-keyword",
            "traffic",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let config = Config::from(cli);
        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(
            config.output_policy(),
            OutputPolicy::Save {
                dir: PathBuf::from("out")
            }
        );
        assert_eq!(config.plot_style().pixel_size(), (3600, 2400));
        assert_eq!(config.topic_keyword, "traffic");
    }

    #[rstest]
    #[case(&["litreview"], "data")]
    #[case(&["litreview", "--data-dir", "/srv/exports"], "/srv/exports")]
    fn test_data_dir_resolution(#[case] args: &[&str], #[case] expected: &str) {
        let config = Config::from(Cli::try_parse_from(args.iter().copied()).unwrap());
        assert_eq!(config.data_dir, PathBuf::from(expected));
    }

    #[test]
    fn test_default_data_dir_is_relative_to_working_directory() {
        assert!(default_data_dir().is_relative());
    }

    #[test]
    fn test_display_mode_uses_screen_resolution() {
        let config = Config::from(Cli::try_parse_from(["litreview"]).unwrap());
        assert_eq!(config.output_policy(), OutputPolicy::Display);
        assert_eq!(config.plot_style().pixel_size(), (1200, 800));
    }

    #[rstest]
    #[case("0.35", Some(0.35))]
    #[case("0", Some(0.0))]
    #[case("1.5", None)]
    #[case("abc", None)]
    fn test_parse_threshold(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_threshold(input).ok(), expected);
    }
}
