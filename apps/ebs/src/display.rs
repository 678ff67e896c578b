//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use ebs_builder::CMakeConfigurePlan;
use ebs_types::{BuildReport, OutputFormat, PackageConfig};
use serde_json::json;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn print_json(value: &serde_json::Value) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    fn table(headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                headers
                    .iter()
                    .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                    .collect::<Vec<_>>(),
            );
        table
    }

    /// Render the outcome of a package build
    pub fn render_build_report(&self, report: &BuildReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                Self::print_json(&serde_json::to_value(report).map_err(io::Error::other)?)
            }
            OutputFormat::Plain => {
                println!("package={}", report.package);
                println!("version={}", report.version);
                println!("handler={}", report.handler);
                println!("install_dir={}", report.install_dir.display());
                println!("duration_ms={}", report.duration_ms);
                for (var, subdirs) in &report.module_requirements {
                    for sub in subdirs {
                        println!("module_requirement={var}:{}", sub.display());
                    }
                }
                Ok(())
            }
            OutputFormat::Tty => {
                println!("Build Summary");
                println!();
                println!("Package:  {} {}", report.package, report.version);
                println!("Handler:  {}", report.handler);
                println!("Install:  {}", report.install_dir.display());
                println!("Duration: {}ms", report.duration_ms);

                if !report.module_requirements.is_empty() {
                    println!();
                    let mut table = Self::table(&["Variable", "Subdirectories"]);
                    for (var, subdirs) in &report.module_requirements {
                        let joined = subdirs
                            .iter()
                            .map(|s| s.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        table.add_row(vec![Cell::new(var), Cell::new(joined)]);
                    }
                    println!("{table}");
                }
                Ok(())
            }
        }
    }

    /// Render a computed cmake configure step
    pub fn render_plan(&self, package: &PackageConfig, plan: &CMakeConfigurePlan) -> io::Result<()> {
        let exports = plan.exports();
        match self.format {
            OutputFormat::Json => {
                let exported: serde_json::Map<String, serde_json::Value> = exports
                    .iter()
                    .map(|(name, value)| ((*name).to_string(), json!(value)))
                    .collect();
                Self::print_json(&json!({
                    "package": package.full_name(),
                    "command": plan.command,
                    "source_dir": plan.source_dir,
                    "build_dir": plan.build_dir,
                    "options": plan.options,
                    "exports": exported,
                }))
            }
            OutputFormat::Plain => {
                for (name, value) in &exports {
                    println!("export {name}={value}");
                }
                if let Some(dir) = &plan.build_dir {
                    println!("cd {}", dir.display());
                }
                println!("{}", plan.command);
                Ok(())
            }
            OutputFormat::Tty => {
                println!("Configure plan for {}", package.full_name());
                println!();
                let mut table = Self::table(&["Setting", "Value"]);
                for (name, value) in &exports {
                    table.add_row(vec![Cell::new(name), Cell::new(value)]);
                }
                let work_dir = plan
                    .build_dir
                    .as_ref()
                    .map_or_else(|| "<start dir>".to_string(), |d| d.display().to_string());
                table.add_row(vec![Cell::new("work dir"), Cell::new(work_dir)]);
                table.add_row(vec![Cell::new("source dir"), Cell::new(&plan.source_dir)]);
                println!("{table}");
                println!();
                println!("{}", plan.command);
                Ok(())
            }
        }
    }

    /// Render the registered handler names
    pub fn render_handlers(&self, names: &[&str]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => Self::print_json(&json!(names)),
            OutputFormat::Plain => {
                for name in names {
                    println!("{name}");
                }
                Ok(())
            }
            OutputFormat::Tty => {
                let mut table = Self::table(&["Handler"]);
                for name in names {
                    table.add_row(vec![Cell::new(name)]);
                }
                println!("{table}");
                Ok(())
            }
        }
    }
}
