use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use mailpatch::PatchFormat;

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub(crate) enum PatchFormatArg {
    Mbox,
}

impl From<PatchFormatArg> for PatchFormat {
    fn from(arg: PatchFormatArg) -> Self {
        match arg {
            PatchFormatArg::Mbox => PatchFormat::Mbox,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mailpatch",
    version,
    about = "Apply a series of patches from a mailbox as commits on the current branch.",
    override_usage = "mailpatch [OPTIONS] [(<mbox>|<Maildir>)...]"
)]
pub(crate) struct Cli {
    /// Format the patch(es) are in
    #[arg(long = "patch-format", value_name = "format", value_enum)]
    pub(crate) patch_format: Option<PatchFormatArg>,

    /// Mailbox files or Maildir directories; a single `-` or no paths
    /// reads the mailbox from standard input
    #[arg(value_name = "mbox|Maildir")]
    pub(crate) paths: Vec<PathBuf>,
}
