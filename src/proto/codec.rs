use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io::{self},
    str,
};
use tokio_util::codec::{Decoder, Encoder};

use super::command::{Command, OutputSyntax};
use super::response::Reply;

#[derive(Default)]
pub struct LineCodec {
    output_syntax: OutputSyntax,
}

impl LineCodec {
    pub fn new(output_syntax: OutputSyntax) -> Self {
        Self { output_syntax }
    }
}

impl Decoder for LineCodec {
    type Item = Reply;
    // We use io::Error here instead of our own Error type because for the
    // low level protocol, receiving an empty or non-numeric line is totally
    // fine, as the decoding is successful. Deciding if this should be
    // returned as an error is up to a higher level.
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(n) = src.as_ref().iter().position(|b| *b == b'\n') {
            let line = src.split_to(n + 1);
            let text = str::from_utf8(&line[..n])
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            Ok(Some(Reply::from_line(text)))
        } else {
            Ok(None)
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &item {
            Command::Ident => write_fmt_guarded(dst, format_args!("*IDN?"))?,
            Command::Output(on) => match self.output_syntax {
                OutputSyntax::Full => {
                    write_fmt_guarded(dst, format_args!("OUTPUT{}", u8::from(*on)))?
                }
                OutputSyntax::Short => {
                    write_fmt_guarded(dst, format_args!("OUT{}", u8::from(*on)))?
                }
            },
            Command::SetVoltage(volts) => {
                write_fmt_guarded(dst, format_args!("VSET1:{}", volts))?
            }
            Command::SetCurrent(amps) => write_fmt_guarded(dst, format_args!("ISET1:{}", amps))?,
            Command::Ovp(on) => write_fmt_guarded(dst, format_args!("OVP{}", u8::from(*on)))?,
            Command::Ocp(on) => write_fmt_guarded(dst, format_args!("OCP{}", u8::from(*on)))?,
            Command::QueryVoltage => write_fmt_guarded(dst, format_args!("VOUT1?"))?,
            Command::QueryCurrent => write_fmt_guarded(dst, format_args!("IOUT1?"))?,
        }
        dst.write_str("\n")
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(())
    }
}
