/// Module for the `classify` subcommand, which reports how the segmenter treats each opcode:
/// its kind, its width in bytes and whether it halts the executing scope.
use async_trait::async_trait;
use clap::Args;
use scopetrace_core::Opcode;
use scopetrace_utils::errors::OpcodeParseError;
use std::error::Error;

/// Arguments for the `classify` subcommand.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Opcodes as mnemonics (CALLER, PUSH2) or bytes (0x33)
    #[arg(required = true)]
    pub ops: Vec<String>,
    /// Emit one JSON object per opcode
    #[arg(long)]
    json: bool,
}

/// Accepts a mnemonic or a `0x`-prefixed byte.
pub fn parse_opcode(input: &str) -> Result<Opcode, OpcodeParseError> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(digits) => u8::from_str_radix(digits, 16)
            .map(|byte| Opcode::parse(byte).0)
            .map_err(|_| OpcodeParseError(input.to_string())),
        None => input.parse(),
    }
}

#[async_trait]
impl super::Command for ClassifyArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        for input in &self.ops {
            let op = parse_opcode(input)?;
            if self.json {
                let line = serde_json::json!({
                    "op": op,
                    "byte": format!("0x{:02x}", op.to_byte()),
                    "kind": op.kind().to_string(),
                    "width": op.width(),
                    "halts": op.can_halt(),
                });
                println!("{line}");
            } else {
                println!(
                    "{:<16} 0x{:02x}  kind={:<13} width={} halts={}",
                    op.to_string(),
                    op.to_byte(),
                    op.kind(),
                    op.width(),
                    op.can_halt()
                );
            }
        }
        Ok(())
    }
}
