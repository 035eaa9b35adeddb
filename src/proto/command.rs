/// Wire syntax for the output stage commands. The PS3005D accepts the full
/// `OUTPUT1`/`OUTPUT0` form, older KA-series firmware only understands
/// `OUT1`/`OUT0`. Confirm against the target unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSyntax {
    #[default]
    Full,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `*IDN?`, answered with the identification string.
    Ident,
    /// Output stage on/off. No reply.
    Output(bool),
    /// `VSET1:{v}`. No reply.
    SetVoltage(f64),
    /// `ISET1:{i}`. No reply.
    SetCurrent(f64),
    /// Over-voltage protection on/off. No reply.
    Ovp(bool),
    /// Over-current protection on/off. No reply.
    Ocp(bool),
    /// `VOUT1?`, answered with the measured output voltage.
    QueryVoltage,
    /// `IOUT1?`, answered with the measured output current.
    QueryCurrent,
}
