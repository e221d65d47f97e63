/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    bpaf_config::mod.rs

    Command line argument definitions.

*/

use std::path::PathBuf;

use crate::script::{parse_number, ScriptAction};

use bpaf::{Bpaf, Parser};

fn script_arg() -> impl Parser<Vec<ScriptAction>> {
    bpaf::short('s')
        .long("script")
        .help("Host action to run, in order: read:LBA:COUNT, write:LBA:BYTE:COUNT, format:LBA, sense, rezero, seek:LBA")
        .argument::<String>("action")
        .parse(|s| s.parse::<ScriptAction>())
        .many()
}

fn base_address_arg() -> impl Parser<Option<usize>> {
    bpaf::long("base_address")
        .help("Controller base address, decimal or hex with a 0x prefix")
        .argument::<String>("address")
        .parse(|s| parse_number(&s).map(|n| n as usize))
        .optional()
}

#[derive(Bpaf, Debug, Default)]
#[bpaf(options, version, generate(cli_args))]
pub struct CmdLineArgs {
    #[bpaf(long("config_file"), long("configfile"))]
    pub config_file: Option<PathBuf>,

    /// Hard disk image to attach to the controller
    #[bpaf(long)]
    pub image: Option<PathBuf>,

    /// Create a blank 20MB image if the image file does not exist
    #[bpaf(long, switch)]
    pub create: bool,

    #[bpaf(external(base_address_arg))]
    pub base_address: Option<usize>,

    #[bpaf(external(script_arg))]
    pub script: Vec<ScriptAction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpaf::Args;

    #[test]
    fn base_address_accepts_hex() {
        let args = cli_args().run_inner(Args::from(&["--base_address", "0xE96000"])).unwrap();
        assert_eq!(args.base_address, Some(0xE96000));

        let args = cli_args().run_inner(Args::from(&["--base_address", "4096"])).unwrap();
        assert_eq!(args.base_address, Some(4096));

        assert!(cli_args().run_inner(Args::from(&["--base_address", "E96000"])).is_err());
    }

    #[test]
    fn script_actions_in_order() {
        let args = cli_args()
            .run_inner(Args::from(&["--script", "sense", "-s", "read:0x10:2", "--create"]))
            .unwrap();
        assert!(args.create);
        assert_eq!(
            args.script,
            vec![ScriptAction::Sense, ScriptAction::Read { lba: 0x10, blocks: 2 }]
        );
    }
}
