//! `CloudProvider` over euca2ools, the glance CLI and nova-manage.
//!
//! euca2ools calls run as the deployable's user with its `novarc`
//! sourced, via `su -c`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{CloudProvider, CommandRunner, GlanceImage, NovaSession};
use crate::domain::openstack::{self, KEYPAIR};
use crate::infra::command_runner::command_failed;
use crate::infra::platform::{ShellPlatform, stdout_or_bail};

impl<R: CommandRunner> ShellPlatform<R> {
    async fn euca(&self, session: NovaSession<'_>, cmd: &str) -> Result<String> {
        let script = openstack::novarc_command(session.keydir, cmd);
        let output = self
            .runner
            .run("su", &["-c", &script, session.user])
            .await
            .with_context(|| format!("su {} -c {cmd}", session.user))?;
        stdout_or_bail(cmd, &output)
    }

    async fn glance(&self, args: &[&str]) -> Result<String> {
        let port = self.glance.port.to_string();
        let mut full = vec!["-H", self.glance.host.as_str(), "-p", port.as_str()];
        full.extend_from_slice(args);
        let output = self.runner.run("glance", &full).await.context("glance")?;
        stdout_or_bail(&format!("glance {}", args.first().unwrap_or(&"")), &output)
    }

    async fn checked(&self, program: &str, args: &[&str]) -> Result<()> {
        let output = self
            .runner
            .run(program, args)
            .await
            .with_context(|| program.to_string())?;
        if !output.status.success() {
            return Err(command_failed(program, &output));
        }
        Ok(())
    }
}

impl<R: CommandRunner> CloudProvider for ShellPlatform<R> {
    async fn run_instance(&self, session: NovaSession<'_>, image: &str) -> Result<()> {
        self.euca(session, &format!("euca-run-instances {image} -k {KEYPAIR}"))
            .await
            .map(drop)
    }

    async fn describe_images(&self, session: NovaSession<'_>) -> Result<String> {
        self.euca(session, "euca-describe-images").await
    }

    async fn describe_instances(&self, session: NovaSession<'_>) -> Result<String> {
        self.euca(session, "euca-describe-instances").await
    }

    async fn terminate_instance(&self, session: NovaSession<'_>, instance: &str) -> Result<()> {
        self.euca(session, &format!("euca-terminate-instances {instance}"))
            .await
            .map(drop)
    }

    async fn glance_index(&self) -> Result<String> {
        self.glance(&["index"]).await
    }

    async fn glance_add(&self, image: GlanceImage<'_>) -> Result<String> {
        let name = format!("name={}", image.name);
        let location = format!("location=file://{}", image.location.display());
        let owner = format!("owner={}", image.owner);
        self.glance(&[
            "add",
            &name,
            "is_public=True",
            "disk_format=raw",
            "container_format=ovf",
            "min_disk=0",
            "min_ram=0",
            &location,
            &owner,
        ])
        .await
    }

    async fn glance_delete(&self, image_id: &str) -> Result<()> {
        self.glance(&["delete", "-f", image_id]).await.map(drop)
    }

    async fn project_create(&self, project: &str, user: &str, project_dir: &Path) -> Result<()> {
        self.checked("id", &["-u", user])
            .await
            .with_context(|| format!("user {user} does not exist"))?;

        let output = self
            .runner
            .run("nova-manage", &["project", "create", project, user])
            .await
            .context("nova-manage project create")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("exists") {
                return Err(command_failed("nova-manage project create", &output));
            }
            tracing::info!(project, "nova project already exists");
        }

        let keydir = project_dir.join("novacreds");
        let zip = project_dir.join("nova.zip");
        let zip_s = zip.to_string_lossy();
        let keydir_s = keydir.to_string_lossy();

        self.checked("nova-manage", &["project", "zipfile", project, user, &zip_s])
            .await?;
        self.checked("unzip", &["-o", "-q", &zip_s, "-d", &keydir_s])
            .await?;
        let key = keydir.join(KEYPAIR);
        self.checked("ssh-keygen", &["-q", "-N", "", "-f", &key.to_string_lossy()])
            .await?;
        let add_keypair = openstack::novarc_command(
            &keydir,
            &format!("euca-add-keypair {KEYPAIR} > {KEYPAIR}.priv"),
        );
        self.checked("sh", &["-c", &add_keypair]).await?;

        let owner = format!("{user}:");
        self.checked("chown", &["-R", &owner, &project_dir.to_string_lossy()])
            .await?;
        let lock_down = format!("chmod 600 {zip_s} {keydir_s}/nova*");
        self.checked("sh", &["-c", &lock_down]).await
    }

    async fn project_delete(&self, project: &str) -> Result<()> {
        self.checked("nova-manage", &["project", "delete", project])
            .await
    }
}
