//text protocol spoken by the rig firmware, one CR-terminated line per command:
//  "<dh>,<dv>\r"      relative move, no reply
//  "MODE:<name>\r"    mode announcement, no reply
//  "RESET\r"          reset request, firmware answers "INIT:<h>,<v>\r\n"

use crate::error::{Result, RigError};
use crate::rig::command::MotorCommand;
use crate::rig::mode::TrackingMode;
use crate::rig::pose::{Pose, PoseLimits};

pub const TERMINATOR: u8 = b'\r';
pub const RESET_REQUEST: &str = "RESET";
pub const INIT_PREFIX: &str = "INIT:";
pub const MODE_PREFIX: &str = "MODE:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCommand{
    Move(MotorCommand),
    Mode(TrackingMode),
    Reset,
}

impl WireCommand{
    pub fn encode(&self) -> Vec<u8>{
        let mut line = match self{
            WireCommand::Move(cmd) => format!("{},{}", cmd.dh, cmd.dv),
            WireCommand::Mode(mode) => format!("{}{}", MODE_PREFIX, mode.announcement()),
            WireCommand::Reset => RESET_REQUEST.to_string(),
        }
        .into_bytes();
        line.push(TERMINATOR);
        line
    }
}

//parse "INIT:<h>,<v>" (surrounding whitespace / CR / LF ignored)
//the whole response is rejected if anything is off, including values outside the limits
pub fn parse_init_response(line: &str, limits: &PoseLimits) -> Result<Pose>{
    let malformed = || RigError::MalformedReset(line.to_string());

    let body = line.trim().strip_prefix(INIT_PREFIX).ok_or_else(malformed)?;
    let mut fields = body.split(',');

    let h = fields.next().and_then(|f| f.trim().parse::<i32>().ok()).ok_or_else(malformed)?;
    let v = fields.next().and_then(|f| f.trim().parse::<i32>().ok()).ok_or_else(malformed)?;
    if fields.next().is_some(){
        return Err(malformed());
    }

    let pose = Pose::new(h, v);
    if !limits.contains(pose){
        return Err(malformed());
    }
    Ok(pose)
}
