use crate::comparator::ComparatorConfig;
use crate::geometry::{ComparedElement, Role, Size};
use crate::image_loader::MediaLoader;
use anyhow::{anyhow, bail, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::time::Duration;

/// 25 Hz, the repaint cadence for video content.
pub const REDRAW_PERIOD: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, PartialEq)]
pub struct ComparatorOptions {
    pub zoom: f32,
    pub magnifier_size: Size,
    pub redraw_period: Duration,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            zoom: 4.0,
            magnifier_size: Size::new(200.0, 200.0),
            redraw_period: REDRAW_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Pair { left: PathBuf, right: PathBuf },
    Single { path: PathBuf, split: Option<SplitMode> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    pub left: Option<String>,
    pub right: Option<String>,
    pub top: Option<String>,
    pub bottom: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub sources: SourceSpec,
    pub labels: Labels,
    pub options: ComparatorOptions,
    pub window_size: (f32, f32),
    pub fps: f32,
    pub num_load_threads: usize,
}

pub fn parse_window_size(size: &str) -> Result<(f32, f32), String> {
    let parts: Vec<&str> = size.split('x').collect();
    if parts.len() != 2 {
        return Err("Invalid size format. Use WIDTHxHEIGHT".to_string());
    }
    let width = parts[0].parse::<f32>().map_err(|_| "Invalid width")?;
    let height = parts[1].parse::<f32>().map_err(|_| "Invalid height")?;
    if width <= 0.0 || height <= 0.0 {
        return Err("Width and height must be positive".to_string());
    }
    Ok((width, height))
}

pub fn build_cli() -> Command {
    Command::new("split_comparator")
        .version("1.0")
        .about("Compares two images or image sequences with a split line and magnifiers")
        .arg(
            Arg::new("left")
                .short('1')
                .long("left")
                .action(ArgAction::Set)
                .value_name("PATH")
                .help("Left source: an image file or a sequence directory")
                .requires("right")
                .conflicts_with("single"),
        )
        .arg(
            Arg::new("right")
                .short('2')
                .long("right")
                .action(ArgAction::Set)
                .value_name("PATH")
                .help("Right source: an image file or a sequence directory")
                .requires("left")
                .conflicts_with("single"),
        )
        .arg(
            Arg::new("single")
                .long("single")
                .action(ArgAction::Set)
                .value_name("PATH")
                .help("One image or sequence holding both sources side by side or stacked"),
        )
        .arg(
            Arg::new("split")
                .long("split")
                .action(ArgAction::Set)
                .value_name("MODE")
                .value_parser(["vertical", "horizontal"])
                .help("How --single is split: vertical (top/bottom) or horizontal (left/right)"),
        )
        .arg(label_arg("label_left", "label-left", "Label of the left source"))
        .arg(label_arg("label_right", "label-right", "Label of the right source"))
        .arg(label_arg("label_top", "label-top", "Label of the top half"))
        .arg(label_arg("label_bottom", "label-bottom", "Label of the bottom half"))
        .arg(
            Arg::new("zoom")
                .long("zoom")
                .action(ArgAction::Set)
                .value_name("FACTOR")
                .help("Initial magnifier zoom (1-10)")
                .default_value("4"),
        )
        .arg(
            Arg::new("magnifier_size")
                .long("magnifier-size")
                .action(ArgAction::Set)
                .value_name("WIDTHxHEIGHT")
                .help("Size of each magnifier panel")
                .default_value("200x200"),
        )
        .arg(
            Arg::new("window_size")
                .short('w')
                .long("window-size")
                .action(ArgAction::Set)
                .value_name("WIDTHxHEIGHT")
                .help("Window size in format WIDTHxHEIGHT (e.g. 1920x1080)")
                .default_value("1280x900"),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .action(ArgAction::Set)
                .value_name("FPS")
                .help("Frames per second for sequences without input.txt")
                .default_value("25"),
        )
        .arg(
            Arg::new("num_load_threads")
                .long("num-load-threads")
                .action(ArgAction::Set)
                .value_name("COUNT")
                .help("Number of threads to use for loading sequences")
                .default_value("2"),
        )
}

fn label_arg(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(long)
        .action(ArgAction::Set)
        .value_name("TEXT")
        .help(help)
}

fn parse_number<T: std::str::FromStr>(matches: &ArgMatches, id: &str) -> Result<T> {
    let raw = matches
        .get_one::<String>(id)
        .ok_or_else(|| anyhow!("Missing value for {}", id))?;
    raw.parse()
        .map_err(|_| anyhow!("Invalid value '{}' for {}", raw, id))
}

fn parse_size_arg(matches: &ArgMatches, id: &str) -> Result<(f32, f32)> {
    let raw = matches
        .get_one::<String>(id)
        .ok_or_else(|| anyhow!("Missing value for {}", id))?;
    parse_window_size(raw).map_err(|e| anyhow!("{}: {}", id, e))
}

impl AppConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = build_cli().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let path = |id: &str| matches.get_one::<String>(id).map(PathBuf::from);
        let sources = match (path("single"), path("left"), path("right")) {
            (Some(path), None, None) => SourceSpec::Single {
                path,
                split: matches
                    .get_one::<String>("split")
                    .map(|mode| match mode.as_str() {
                        "vertical" => SplitMode::Vertical,
                        _ => SplitMode::Horizontal,
                    }),
            },
            (None, Some(left), Some(right)) => SourceSpec::Pair { left, right },
            _ => bail!("Either --single or both --left and --right must be given"),
        };

        let label = |id: &str| matches.get_one::<String>(id).cloned();
        let labels = Labels {
            left: label("label_left"),
            right: label("label_right"),
            top: label("label_top"),
            bottom: label("label_bottom"),
        };

        let (magnifier_width, magnifier_height) = parse_size_arg(matches, "magnifier_size")?;
        let options = ComparatorOptions {
            zoom: parse_number(matches, "zoom")?,
            magnifier_size: Size::new(magnifier_width, magnifier_height),
            redraw_period: REDRAW_PERIOD,
        };

        Ok(Self {
            sources,
            labels,
            options,
            window_size: parse_size_arg(matches, "window_size")?,
            fps: parse_number(matches, "fps")?,
            num_load_threads: parse_number(matches, "num_load_threads")?,
        })
    }

    pub fn element_roles(&self) -> Vec<(PathBuf, Role)> {
        let labels = self.labels.clone();
        match &self.sources {
            SourceSpec::Pair { left, right } => vec![
                (left.clone(), Role::Left { label: labels.left }),
                (right.clone(), Role::Right { label: labels.right }),
            ],
            SourceSpec::Single { path, split } => {
                let role = match split {
                    Some(SplitMode::Vertical) => Role::VerticalSplit {
                        top: labels.top,
                        bottom: labels.bottom,
                    },
                    Some(SplitMode::Horizontal) => Role::HorizontalSplit {
                        left: labels.left,
                        right: labels.right,
                    },
                    None => Role::Unmarked,
                };
                vec![(path.clone(), role)]
            }
        }
    }

    pub fn comparator_config(&self, loader: &MediaLoader) -> Result<ComparatorConfig> {
        let elements = self
            .element_roles()
            .into_iter()
            .map(|(path, role)| -> Result<ComparedElement> {
                Ok(ComparedElement::new(loader.open(&path)?, role))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ComparatorConfig::new(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_parsing() {
        assert_eq!(parse_window_size("1920x1080"), Ok((1920.0, 1080.0)));
        assert!(parse_window_size("1920").is_err());
        assert!(parse_window_size("ax10").is_err());
        assert!(parse_window_size("0x10").is_err());
    }

    #[test]
    fn pair_arguments() {
        let config = AppConfig::from_args([
            "split_comparator",
            "-1",
            "before.png",
            "--right",
            "after.png",
            "--label-left",
            "Before",
            "--zoom",
            "6",
        ])
        .unwrap();

        assert_eq!(
            config.sources,
            SourceSpec::Pair {
                left: "before.png".into(),
                right: "after.png".into()
            }
        );
        assert_eq!(config.options.zoom, 6.0);
        assert_eq!(config.options.magnifier_size, Size::new(200.0, 200.0));
        assert_eq!(config.options.redraw_period, Duration::from_millis(40));
        assert_eq!(config.fps, 25.0);

        let roles = config.element_roles();
        assert_eq!(roles[0].1, Role::Left { label: Some("Before".into()) });
        assert_eq!(roles[1].1, Role::Right { label: None });
    }

    #[test]
    fn single_split_arguments() {
        let config = AppConfig::from_args([
            "split_comparator",
            "--single",
            "stacked",
            "--split",
            "vertical",
            "--label-top",
            "old",
            "--label-bottom",
            "new",
            "--magnifier-size",
            "160x120",
        ])
        .unwrap();

        assert_eq!(config.options.magnifier_size, Size::new(160.0, 120.0));
        assert_eq!(
            config.element_roles(),
            vec![(
                PathBuf::from("stacked"),
                Role::VerticalSplit {
                    top: Some("old".into()),
                    bottom: Some("new".into())
                }
            )]
        );
    }

    #[test]
    fn single_without_split_is_unmarked() {
        let config = AppConfig::from_args(["split_comparator", "--single", "frame.png"]).unwrap();
        assert_eq!(config.element_roles()[0].1, Role::Unmarked);
    }

    #[test]
    fn missing_or_conflicting_sources_are_rejected() {
        assert!(AppConfig::from_args(["split_comparator"]).is_err());
        assert!(AppConfig::from_args(["split_comparator", "--left", "a.png"]).is_err());
        assert!(AppConfig::from_args([
            "split_comparator",
            "--single",
            "a.png",
            "--left",
            "b.png",
            "--right",
            "c.png"
        ])
        .is_err());
        assert!(AppConfig::from_args(["split_comparator", "--single", "a", "--split", "diagonal"]).is_err());
    }
}
