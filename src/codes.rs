// Response codes returned by the Funix Cloud API and the canned messages
// shown to the user for each of them. The numbering follows the current
// API generation where `0` means success.

/// Every code the API is known to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    ServerError,
    DatabaseError,
    InvalidArguments,
    NoAccessPermission,
    // account
    InvalidUsername,
    InvalidPassword,
    SamePassword,
    UsernameAlreadyExists,
    IncorrectPassword,
    MismatchedEmail,
    EmailSendTooFrequently,
    RequireEmailVerification,
    InvalidBindingTicket,
    InvalidBindingCode,
    AlreadyHas2FA,
    // instance
    CannotCloneGitRepo,
    SpecialFoldersNotAllowed,
    GitFolderNotAllowed,
    RequirementsTxtNotFound,
    NoFunixInRequirementsTxt,
    FileTooLarge,
    FileNotFound,
    IllegalString,
    ArgumentTooLong,
    InstancesTooMany,
    DuplicationName,
    InstanceNotFound,
    UserHasNoInstance,
    InstanceNotPrepared,
    BodyNoMultiPart,
    FileIsCleaned,
    InstanceNotPaused,
}

/// Code/variant pairs. Kept as one table so both lookup directions agree.
const TABLE: &[(i64, ErrorCode)] = &[
    (0, ErrorCode::Success),
    (500, ErrorCode::ServerError),
    (501, ErrorCode::DatabaseError),
    (510, ErrorCode::InvalidArguments),
    (511, ErrorCode::NoAccessPermission),
    (100001, ErrorCode::InvalidUsername),
    (100002, ErrorCode::InvalidPassword),
    (100003, ErrorCode::SamePassword),
    (100004, ErrorCode::UsernameAlreadyExists),
    (100005, ErrorCode::IncorrectPassword),
    (100006, ErrorCode::MismatchedEmail),
    (100007, ErrorCode::EmailSendTooFrequently),
    (100008, ErrorCode::RequireEmailVerification),
    (100009, ErrorCode::InvalidBindingTicket),
    (100010, ErrorCode::InvalidBindingCode),
    (100011, ErrorCode::AlreadyHas2FA),
    (103001, ErrorCode::CannotCloneGitRepo),
    (103002, ErrorCode::SpecialFoldersNotAllowed),
    (103003, ErrorCode::GitFolderNotAllowed),
    (103004, ErrorCode::RequirementsTxtNotFound),
    (103005, ErrorCode::NoFunixInRequirementsTxt),
    (103006, ErrorCode::FileTooLarge),
    (103007, ErrorCode::FileNotFound),
    (103008, ErrorCode::IllegalString),
    (103009, ErrorCode::ArgumentTooLong),
    (103013, ErrorCode::InstancesTooMany),
    (103014, ErrorCode::DuplicationName),
    (103016, ErrorCode::InstanceNotFound),
    (103018, ErrorCode::UserHasNoInstance),
    (103019, ErrorCode::InstanceNotPrepared),
    (103020, ErrorCode::BodyNoMultiPart),
    (103021, ErrorCode::FileIsCleaned),
    (103022, ErrorCode::InstanceNotPaused),
];

impl ErrorCode {
    pub fn from_code(code: i64) -> Option<Self> {
        TABLE.iter().find(|(c, _)| *c == code).map(|(_, e)| *e)
    }

    pub fn code(self) -> i64 {
        TABLE
            .iter()
            .find(|(_, e)| *e == self)
            .map(|(c, _)| *c)
            .unwrap_or_default()
    }

    /// Server-side failures where the raw response is worth showing so the
    /// user can attach it to a bug report.
    pub fn dumps_raw(self) -> bool {
        matches!(
            self,
            ErrorCode::ServerError
                | ErrorCode::DatabaseError
                | ErrorCode::InvalidArguments
                | ErrorCode::NoAccessPermission
                | ErrorCode::EmailSendTooFrequently
        )
    }

    /// Short label used in tables and one-line summaries.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::ServerError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::InvalidArguments => "Invalid arguments",
            ErrorCode::NoAccessPermission => "No access permission",
            ErrorCode::InvalidUsername => "Invalid username",
            ErrorCode::InvalidPassword => "Invalid password",
            ErrorCode::SamePassword => "Same password",
            ErrorCode::UsernameAlreadyExists => "Username already exists",
            ErrorCode::IncorrectPassword => "Incorrect password",
            ErrorCode::MismatchedEmail => "Mismatched email",
            ErrorCode::EmailSendTooFrequently => "Email sent too frequently",
            ErrorCode::RequireEmailVerification => "Email verification required",
            ErrorCode::InvalidBindingTicket => "Invalid binding ticket",
            ErrorCode::InvalidBindingCode => "Invalid binding code",
            ErrorCode::AlreadyHas2FA => "2FA already bound",
            ErrorCode::CannotCloneGitRepo => "Git repo cannot be cloned",
            ErrorCode::SpecialFoldersNotAllowed => "Found .ebextensions or .platform folder",
            ErrorCode::GitFolderNotAllowed => "Found .git folder",
            ErrorCode::RequirementsTxtNotFound => "requirements.txt not found",
            ErrorCode::NoFunixInRequirementsTxt => "funix missing from requirements.txt",
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::FileNotFound => "Entry point not found",
            ErrorCode::IllegalString => "Illegal characters in argument",
            ErrorCode::ArgumentTooLong => "Argument too long",
            ErrorCode::InstancesTooMany => "Too many instances",
            ErrorCode::DuplicationName => "Duplicate name",
            ErrorCode::InstanceNotFound => "Instance not found",
            ErrorCode::UserHasNoInstance => "User has no instances",
            ErrorCode::InstanceNotPrepared => "Instance not prepared",
            ErrorCode::BodyNoMultiPart => "No file uploaded",
            ErrorCode::FileIsCleaned => "File is cleaned",
            ErrorCode::InstanceNotPaused => "Instance is not paused",
        }
    }

    /// Remediation text printed when a request fails with this code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success.",
            ErrorCode::ServerError => {
                "The Funix Cloud server ran into a problem and could not process your request. \
                 The raw response is below if you want to report an issue."
            }
            ErrorCode::DatabaseError => {
                "Database error. Read the raw message below and check that your actions are correct. \
                 If they are, please report an issue."
            }
            ErrorCode::InvalidArguments => {
                "Invalid arguments. Please check your arguments. If they look right, this client \
                 may be older than the server; update it or report an issue."
            }
            ErrorCode::NoAccessPermission => {
                "No access permission. You may need to log in, or the user/instance id you entered \
                 is not yours. The raw message is below; report an issue if everything looks fine."
            }
            ErrorCode::InvalidUsername => {
                "Invalid username. Username length should be 5-50, and it may only contain letters, \
                 numbers, underscores and hyphens."
            }
            ErrorCode::InvalidPassword => {
                "Invalid password. Password length should be 8-64, and it should contain at least \
                 two of: uppercase letters, lowercase letters, numbers, special characters."
            }
            ErrorCode::SamePassword => {
                "The new password cannot be the same as the one you are currently using."
            }
            ErrorCode::UsernameAlreadyExists => {
                "This username is already taken. Please pick another one."
            }
            ErrorCode::IncorrectPassword => {
                "Incorrect password. If you don't remember your password, use \
                 `funix-cloud user forget-password` to reset it."
            }
            ErrorCode::MismatchedEmail => {
                "The email address does not match this account. If you can't find it, \
                 contact support@funix.io"
            }
            ErrorCode::EmailSendTooFrequently => {
                "Emails are being requested too often, please wait a moment. If you never get \
                 the email, contact support@funix.io"
            }
            ErrorCode::RequireEmailVerification => {
                "You need to verify your email address before you can do this. Use \
                 `funix-cloud user bind <email>` to bind your email address."
            }
            ErrorCode::InvalidBindingTicket => {
                "Invalid binding ticket. Check the ticket and try again."
            }
            ErrorCode::InvalidBindingCode => "Invalid binding code. Check the code and try again.",
            ErrorCode::AlreadyHas2FA => "Your account already has 2FA bound.",
            ErrorCode::CannotCloneGitRepo => {
                "Funix Cloud cannot clone your git repo. Check the repo url; if it is private, \
                 make it public or deploy it from a local folder instead."
            }
            ErrorCode::SpecialFoldersNotAllowed => {
                "Please delete `.ebextensions` and `.platform` from your project."
            }
            ErrorCode::GitFolderNotAllowed => "Please delete the `.git` folder from your project.",
            ErrorCode::RequirementsTxtNotFound => {
                "Your project needs a `requirements.txt` that lists `funix`."
            }
            ErrorCode::NoFunixInRequirementsTxt => {
                "Your `requirements.txt` must list `funix`, please add it."
            }
            ErrorCode::FileTooLarge => {
                "File too large. Uploads must be smaller than 200MB; contact support@funix.io \
                 if you need more."
            }
            ErrorCode::FileNotFound => {
                "Your python entry file was not found. Check that it exists at the path you gave."
            }
            ErrorCode::IllegalString => {
                "Your argument contains illegal characters, remove: ()[]<>:\"'/\\|?*"
            }
            ErrorCode::ArgumentTooLong => {
                "Your argument is longer than 128 characters. Please shorten it."
            }
            ErrorCode::InstancesTooMany => {
                "You already have 10 instances. Contact support@funix.io if you need more."
            }
            ErrorCode::DuplicationName => {
                "You already used this app name, please choose another one."
            }
            ErrorCode::InstanceNotFound => "Instance not found, please check your instance id.",
            ErrorCode::UserHasNoInstance => "You have no instances yet.",
            ErrorCode::InstanceNotPrepared => {
                "The instance is not ready yet, try again later. If it stays unprepared for a \
                 long time, contact support@funix.io"
            }
            ErrorCode::BodyNoMultiPart => "No file was uploaded with the request.",
            ErrorCode::FileIsCleaned => {
                "The uploaded file was not found or was removed after the 30-minute temporary \
                 file limit. Upload it again."
            }
            ErrorCode::InstanceNotPaused => "Your instance is not paused, so it cannot be restored.",
        }
    }
}

/// Message for any numeric code, falling back to a generic text that keeps
/// the raw code visible.
pub fn describe(code: i64) -> String {
    match ErrorCode::from_code(code) {
        Some(known) => known.message().to_string(),
        None => format!("Unknown error code `{code}`."),
    }
}

/// Lifecycle stage of an instance as reported by the `state` field.
pub fn instance_state(state: i64) -> String {
    let label = match state {
        100 => "Task Created",
        101 => "Repo or File Processing",
        102 => "Generating Config",
        103 => "Uploading Code",
        104 => "Creating Environment",
        200 => "Success",
        201 => "Paused",
        400 => "Failed",
        other => return format!("Unknown state ({other})"),
    };
    label.to_string()
}

/// One-line outcome of an instance as reported by the `status` field.
pub fn instance_status(status: i64) -> String {
    match ErrorCode::from_code(status) {
        Some(code) => code.label().to_string(),
        None => format!("Unknown status ({status})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_codes_are_unique_and_round_trip() {
        for (code, variant) in TABLE {
            assert_eq!(ErrorCode::from_code(*code), Some(*variant));
            assert_eq!(variant.code(), *code);
        }
    }

    #[test]
    fn incorrect_password_points_to_reset() {
        let msg = describe(100005);
        assert!(msg.starts_with("Incorrect password."));
        assert!(msg.contains("forget-password"));
    }

    #[test]
    fn unknown_code_keeps_the_raw_value() {
        let msg = describe(424242);
        assert!(msg.to_lowercase().contains("unknown error"));
        assert!(msg.contains("424242"));
    }

    #[test]
    fn only_server_side_codes_dump_raw() {
        assert!(ErrorCode::ServerError.dumps_raw());
        assert!(ErrorCode::NoAccessPermission.dumps_raw());
        assert!(!ErrorCode::IncorrectPassword.dumps_raw());
        assert!(!ErrorCode::InstanceNotFound.dumps_raw());
    }

    #[test]
    fn instance_tables() {
        assert_eq!(instance_state(100), "Task Created");
        assert_eq!(instance_state(200), "Success");
        assert_eq!(instance_state(201), "Paused");
        assert_eq!(instance_state(400), "Failed");
        assert_eq!(instance_state(7), "Unknown state (7)");
        assert_eq!(instance_status(103003), "Found .git folder");
        assert_eq!(instance_status(0), "Success");
    }
}
