//! Parsing helpers for the euca2ools output used to drive openstack.

use std::path::{Path, PathBuf};

/// Key pair every deployable's instances are launched with.
pub const KEYPAIR: &str = "nova_key";

/// Directory holding a deployable's unpacked nova credentials.
#[must_use]
pub fn keydir(dbdir: &Path, deployment: &str) -> PathBuf {
    dbdir.join(deployment).join("novacreds")
}

/// Shell snippet run as the deployable's user: source the credentials, then
/// run `cmd`.
#[must_use]
pub fn novarc_command(keydir: &Path, cmd: &str) -> String {
    format!("cd {} && . ./novarc && {cmd}", keydir.display())
}

/// AMI id of the image registered under `image_name`.
///
/// `euca-describe-images` prints the manifest as `... (<name>)`; the AMI is
/// the second column of that line. The last matching line wins.
#[must_use]
pub fn find_ami(describe_images: &str, image_name: &str) -> Option<String> {
    let needle = format!(" ({image_name})");
    describe_images
        .lines()
        .filter(|l| l.contains(&needle))
        .filter_map(|l| l.split_whitespace().nth(1))
        .last()
        .map(str::to_string)
}

/// Instance id of the first instance launched from `ami`.
#[must_use]
pub fn find_instance(describe_instances: &str, ami: &str) -> Option<String> {
    describe_instances
        .lines()
        .filter(|l| l.contains(ami))
        .find_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Image id listed by `glance index` for `name`.
///
/// Data rows start with the id followed by the name; header and separator
/// rows never match.
#[must_use]
pub fn find_glance_image(index: &str, name: &str) -> Option<String> {
    index.lines().find_map(|l| {
        let mut cols = l.split_whitespace();
        let id = cols.next()?;
        (cols.next()? == name).then(|| id.to_string())
    })
}
