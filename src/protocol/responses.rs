//! FTP Response handling
//!
//! Defines FTP response codes and formatting.

/// Standard FTP response codes
pub const FILE_STATUS_OK: u16 = 150;
pub const OK: u16 = 200;
pub const EXTENSIONS_SUPPORTED: u16 = 211;
pub const SYSTEM_TYPE: u16 = 215;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const ENTERING_EXTENDED_PASSIVE: u16 = 229;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const CANNOT_OPEN_DATA_CONNECTION: u16 = 425;
pub const LOCAL_PROCESSING_ERROR: u16 = 451;
pub const FILE_UNAVAILABLE: u16 = 452;
pub const COMMAND_NOT_SUPPORTED: u16 = 500;
pub const SYNTAX_ERROR: u16 = 501;
pub const PARAMETER_NOT_IMPLEMENTED: u16 = 504;
pub const FILE_NOT_FOUND: u16 = 550;

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_code_space_text_crlf() {
        assert_eq!(format_response(READY, "CoolFTPServer"), "220 CoolFTPServer\r\n");
        assert_eq!(
            format_response(COMMAND_NOT_SUPPORTED, "Command not supported"),
            "500 Command not supported\r\n"
        );
    }
}
