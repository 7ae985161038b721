//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{Assembly, AssemblyState, Deployable, Jeos, PcloudConfig, Resource};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// One `"{name} {arch}"` line per image.
    pub fn render_jeos_list(&self, images: &[Jeos]) {
        for jeos in images {
            println!("{} {}", jeos.name, jeos.arch);
        }
    }

    pub fn render_assembly_list(&self, assemblies: &[Assembly]) {
        for assembly in assemblies {
            println!("{}", assembly.name);
        }
    }

    pub fn render_assembly_status(&self, name: &str, state: AssemblyState) {
        println!(
            " {:<12} {}",
            name,
            state.to_string().style(self.ctx.styles.state(state))
        );
    }

    /// Resources of one assembly, with their parameters indented below.
    pub fn render_resource_list(&self, resources: &[Resource]) {
        if resources.is_empty() {
            if !self.ctx.quiet {
                self.ctx.info("no resources");
            }
            return;
        }
        for r in resources {
            let provider = r.provider.as_deref().unwrap_or("-");
            println!(
                " {:<16} {:<10} {:<8} {:<12} {}",
                r.name, r.kind, r.class, provider, r.monitor_interval
            );
            for (k, v) in &r.params {
                println!("     {}={v}", k.style(self.ctx.styles.dim));
            }
        }
    }

    pub fn render_deployable_list(&self, deployables: &[Deployable]) {
        for d in deployables {
            println!("{}", d.name);
        }
    }

    pub fn render_member_list(&self, members: &[String]) {
        for name in members {
            println!("{name}");
        }
    }

    /// Status table: a header line, a rule, then one row per assembly.
    pub fn render_deployable_status(&self, rows: &[(String, AssemblyState)]) {
        println!(" {:<12} {:<12}", "Assembly", "Status");
        println!(" {}", "-".repeat(25));
        for (name, state) in rows {
            // Pad before styling so escape codes do not skew the column.
            let label = format!("{:<12}", state.to_string());
            println!(" {name:<12} {}", label.style(self.ctx.styles.state(*state)));
        }
    }

    /// Render the current configuration.
    pub fn render_config(&self, config: &PcloudConfig, path: &std::path::Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<22} {}", "version:", config.version);
        println!("  {:<22} {}", "dbdir:", config.dbdir.display());
        println!("  {:<22} {}", "images_dir:", config.images_dir.display());
        println!("  {:<22} {}", "run_dir:", config.run_dir.display());
        println!("  {:<22} {}", "libvirt_uri:", config.libvirt_uri);
        println!("  {:<22} {}", "bus_url:", config.bus_url);
        println!(
            "  {:<22} {}",
            "resource_templates:",
            config.resource_templates.display()
        );
        println!("  {:<22} {}", "glance.host:", config.glance.host);
        println!("  {:<22} {}", "glance.port:", config.glance.port);
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in [
            crate::infra::config::CONFIG_ENV,
            crate::domain::config::DBDIR_ENV,
            "NO_COLOR",
        ] {
            println!(
                "    {:<20} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("pcloudsh {version}");
    }

    pub fn render_event(&self, event: &pcloud_common::BusEvent) {
        println!("Event: {:?}", event.properties);
    }
}
