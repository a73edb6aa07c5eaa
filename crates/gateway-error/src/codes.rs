//! Stable `E_*` error code constants and their canonical messages.
//!
//! Every handler and dependency-resolution failure maps to one of these
//! codes; the string is part of the wire contract and must never change
//! once shipped.

/// Minimal HTTP-status representation so this module stays usable without
/// the `axum-compat` feature; [`crate::http`] converts it to
/// `axum::http::StatusCode` when that feature is enabled.
pub type Status = u16;

const OK: Status = 200;
const UNAUTHORIZED: Status = 401;
const FORBIDDEN: Status = 403;
const NOT_FOUND: Status = 404;
const CONFLICT: Status = 409;
const PAYLOAD_TOO_LARGE: Status = 413;
const UNPROCESSABLE_ENTITY: Status = 422;
const INTERNAL_SERVER_ERROR: Status = 500;

macro_rules! error_codes {
    ($( $variant:ident => ($code:literal, $status:expr, $msg:literal) ),* $(,)?) => {
        /// Closed set of gateway error codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum ErrorCode {
            $( $variant, )*
        }

        impl ErrorCode {
            /// The wire-level string constant (e.g. `"E_USER_NOT_FOUND"`).
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $code, )*
                }
            }

            /// Human-readable message shown to clients.
            #[must_use]
            pub const fn message(self) -> &'static str {
                match self {
                    $( Self::$variant => $msg, )*
                }
            }

            /// Default HTTP status for this code.
            #[must_use]
            pub const fn status(self) -> Status {
                match self {
                    $( Self::$variant => $status, )*
                }
            }
        }
    };
}

error_codes! {
    NoError => ("E_NO_ERROR", OK, "No error. Operation successful"),
    InternalError => ("E_INTERNAL_ERROR", INTERNAL_SERVER_ERROR, "Internal error occurred. Please, try again later or contact support service"),
    WrongRequest => ("E_WRONG_REQUEST", UNPROCESSABLE_ENTITY, "Wrong request parameters"),

    // access / session
    AuthorizationRequired => ("E_AUTHORIZATION_REQUIRED", UNAUTHORIZED, "Authorization required"),
    SessionNotFound => ("E_SESSION_NOT_FOUND", UNAUTHORIZED, "Session not found or expired"),
    LoginFailed => ("E_LOGIN_FAILED", UNAUTHORIZED, "Login failed: Invalid username or password"),
    AccessDenied => ("E_ACCESS_DENIED", FORBIDDEN, "Access denied"),
    AdminRequired => ("E_ADMIN_REQUIRED", FORBIDDEN, "Administrator rights required"),
    SystemAdminRequired => ("E_SYSTEM_ADMIN_REQUIRED", FORBIDDEN, "System administrator rights required"),
    ClientAccountRequired => ("E_CLIENT_ACCOUNT_REQUIRED", FORBIDDEN, "Please, use client account to manage data on this route"),
    DeviceCookieLockout => ("E_DEVICE_COOKIE_LOCKOUT", FORBIDDEN, "Account locked out. Please, try again later"),
    DeviceCookieInvalid => ("E_DEVICE_COOKIE_INVALID", FORBIDDEN, "Provided device cookie is invalid"),

    // CSRF
    CsrfTokenMissing => ("E_CSRF_TOKEN_MISSING", FORBIDDEN, "CSRF token is missing. Ensure it's present in both cookies and request headers"),
    CsrfTokenMismatch => ("E_CSRF_TOKEN_MISMATCH", FORBIDDEN, "Provided CSRF tokens in cookies and request headers do not match"),
    CsrfTokenInvalid => ("E_CSRF_TOKEN_INVALID", FORBIDDEN, "Provided CSRF token is invalid or expired"),
    CsrfTokenUserMismatch => ("E_CSRF_TOKEN_USER_MISMATCH", FORBIDDEN, "Provided CSRF token does not match the current user"),

    // user
    UserNotFound => ("E_USER_NOT_FOUND", NOT_FOUND, "Requested user does not exist"),
    UserExists => ("E_USER_EXISTS", CONFLICT, "User with this name already exists"),
    UserDeleted => ("E_USER_DELETED", CONFLICT, "Unable to perform operation, because user is deleted"),
    UserNotDeleted => ("E_USER_NOT_DELETED", CONFLICT, "Can't restore user that not deleted"),
    UserBeingErased => ("E_USER_BEING_ERASED", CONFLICT, "Unable to perform operation, because user is being erased"),
    AccountNotConfirmed => ("E_ACCOUNT_NOT_CONFIRMED", FORBIDDEN, "Account is not activated. Please, check your email/telephone for activation link"),
    AccountDisabled => ("E_ACCOUNT_DISABLED", FORBIDDEN, "Account is disabled. Please, contact support service to get more information"),
    WrongPassword => ("E_WRONG_PASSWORD", UNAUTHORIZED, "Wrong password"),

    // project / pool
    ProjectNotFound => ("E_PROJECT_NOT_FOUND", NOT_FOUND, "Requested project does not exist"),
    ProjectExists => ("E_PROJECT_EXISTS", CONFLICT, "Project with this name already exists"),
    ProjectDeleted => ("E_PROJECT_DELETED", CONFLICT, "Unable to perform operation, because project is deleted"),
    ProjectNotDeleted => ("E_PROJECT_NOT_DELETED", CONFLICT, "Can't restore project that not deleted"),
    ProjectBeingErased => ("E_PROJECT_BEING_ERASED", CONFLICT, "Unable to perform operation, because project is being erased"),
    PoolNotFound => ("E_POOL_NOT_FOUND", NOT_FOUND, "Resource pool not found"),
    PoolExists => ("E_POOL_EXISTS", CONFLICT, "Resource pool already exists"),
    PoolLocked => ("E_POOL_LOCKED", CONFLICT, "Resource pool is being changed now. Please, try again later"),
    CpuRamMultiplicityBroken => ("E_CPU_RAM_MULTIPLICITY_BROKEN", UNPROCESSABLE_ENTITY, "The amount of RAM should be a multiple of the number of processor cores"),
    NodeCpuInvalid => ("E_NODE_CPU_INVALID", UNPROCESSABLE_ENTITY, "Invalid number of cpu cores to allocate for node"),
    NodeRamInvalid => ("E_NODE_RAM_INVALID", UNPROCESSABLE_ENTITY, "Invalid amount of memory to allocate for node"),
    InvalidNodeGroup => ("E_INVALID_NODE_GROUP", UNPROCESSABLE_ENTITY, "Invalid node group for this platform type"),

    // fuzzer
    FuzzerNotFound => ("E_FUZZER_NOT_FOUND", NOT_FOUND, "Requested fuzzer does not exist"),
    FuzzerExists => ("E_FUZZER_EXISTS", CONFLICT, "Fuzzer with this name already exists"),
    FuzzerDeleted => ("E_FUZZER_DELETED", CONFLICT, "Unable to perform operation, because fuzzer is deleted"),
    FuzzerNotDeleted => ("E_FUZZER_NOT_DELETED", CONFLICT, "Can't restore fuzzer that not deleted"),
    FuzzerBeingErased => ("E_FUZZER_BEING_ERASED", CONFLICT, "Unable to perform operation, because fuzzer is being erased"),
    FuzzerLangMismatch => ("E_FUZZER_LANG_MISMATCH", UNPROCESSABLE_ENTITY, "Selected docker image has a programming language different from specified in request"),
    FuzzerEngineMismatch => ("E_FUZZER_ENGINE_MISMATCH", UNPROCESSABLE_ENTITY, "Selected docker image has a fuzzer engine different from specified in request"),
    FuzzerNotInTrashbin => ("E_FUZZER_NOT_IN_TRASHBIN", CONFLICT, "Fuzzer not in trashbin"),
    ActiveRevisionNotFound => ("E_ACTIVE_REVISION_NOT_FOUND", NOT_FOUND, "Active revision not selected"),

    // revision
    RevisionNotFound => ("E_REVISION_NOT_FOUND", NOT_FOUND, "Requested fuzzer revision does not exist"),
    RevisionExists => ("E_REVISION_EXISTS", CONFLICT, "Fuzzer revision with this name already exists"),
    RevisionDeleted => ("E_REVISION_DELETED", CONFLICT, "Unable to perform operation, because revision is deleted"),
    RevisionNotDeleted => ("E_REVISION_NOT_DELETED", CONFLICT, "Can't restore revision that not deleted"),
    RevisionBeingErased => ("E_REVISION_BEING_ERASED", CONFLICT, "Unable to perform operation, because revision is being erased"),
    RevisionCanNotBeChanged => ("E_REVISION_CAN_NOT_BE_CHANGED", CONFLICT, "Specified type of data can't be changed in current state"),
    RevisionIsNotRunning => ("E_REVISION_IS_NOT_RUNNING", CONFLICT, "Revision is not running"),
    RevisionCanOnlyRestart => ("E_REVISION_CAN_ONLY_RESTART", CONFLICT, "Revision in this state can be only restarted"),
    RevisionAlreadyRunning => ("E_REVISION_ALREADY_RUNNING", CONFLICT, "Revision already running"),
    MustUploadBinaries => ("E_MUST_UPLOAD_BINARIES", CONFLICT, "You must upload at least binaries to run revision"),
    NoPoolToUse => ("E_NO_POOL_TO_USE", CONFLICT, "Current project doesn't have a resource pool. Please, create it to continue"),
    CpuUsageInvalid => ("E_CPU_USAGE_INVALID", UNPROCESSABLE_ENTITY, "Invalid CPU usage specified for the revision. Check it does not exceed pool limits"),
    RamUsageInvalid => ("E_RAM_USAGE_INVALID", UNPROCESSABLE_ENTITY, "Invalid RAM usage specified for the revision. Check it does not exceed pool limits"),
    TmpfsSizeInvalid => ("E_TMPFS_SIZE_INVALID", UNPROCESSABLE_ENTITY, "Invalid TmpFS size specified for the revision. Check it does not exceed pool limits"),
    TotalRamUsageInvalid => ("E_TOTAL_RAM_USAGE_INVALID", UNPROCESSABLE_ENTITY, "Sum of TmpFS size and RAM usage exceeds pool limits"),
    SourceRevisionNotFound => ("E_SOURCE_REVISION_NOT_FOUND", NOT_FOUND, "Source revision not found"),
    TargetRevisionNotFound => ("E_TARGET_REVISION_NOT_FOUND", NOT_FOUND, "Destination revision not found"),
    CorpusOverwriteForbidden => ("E_CORPUS_OVERWRITE_FORBIDDEN", CONFLICT, "Corpus files overwrite is forbidden, if target revision has had any runs"),
    NoCorpusFound => ("E_NO_CORPUS_FOUND", NOT_FOUND, "Corpus files were not found"),
    CopySourceTargetSame => ("E_COPY_SOURCE_TARGET_SAME", CONFLICT, "Source and target revision IDs are the same"),

    // image
    ImageNotFound => ("E_IMAGE_NOT_FOUND", NOT_FOUND, "Requested image does not exist"),
    ImageExists => ("E_IMAGE_EXISTS", CONFLICT, "Image with this name already exists"),
    ImageNotReady => ("E_IMAGE_NOT_READY", CONFLICT, "Specified image can't be used to run fuzzer"),
    EngineLangIncompatible => ("E_ENGINE_LANG_INCOMPATIBLE", UNPROCESSABLE_ENTITY, "This fuzzer engine is not compatible with programming language specified"),

    // engine
    EngineNotFound => ("E_ENGINE_NOT_FOUND", NOT_FOUND, "Requested engine does not exist"),
    EngineExists => ("E_ENGINE_EXISTS", CONFLICT, "Engine with this id already exists"),
    EngineLangNotEnabled => ("E_ENGINE_LANG_NOT_ENABLED", CONFLICT, "Specified lang is not enabled for this engine"),
    EngineLangAlreadyEnabled => ("E_ENGINE_LANG_ALREADY_ENABLED", CONFLICT, "Specified lang already enabled for this engine"),
    EnginesInvalid => ("E_ENGINES_INVALID", UNPROCESSABLE_ENTITY, "Provided invalid engines"),
    EngineInUseBy => ("E_ENGINE_IN_USE_BY", CONFLICT, "Engine is in use by"),

    // lang
    LangNotFound => ("E_LANG_NOT_FOUND", NOT_FOUND, "Requested language does not exist"),
    LangExists => ("E_LANG_EXISTS", CONFLICT, "Language with this id already exists"),
    LangsInvalid => ("E_LANGS_INVALID", UNPROCESSABLE_ENTITY, "Provided invalid langs"),
    LangInUseBy => ("E_LANG_IN_USE_BY", CONFLICT, "Lang is in use by"),

    // integration
    IntegrationNotFound => ("E_INTEGRATION_NOT_FOUND", NOT_FOUND, "Requested integration does not exist"),
    IntegrationExists => ("E_INTEGRATION_EXISTS", CONFLICT, "Integration with this name already exists"),
    IntegrationTypeMismatch => ("E_INTEGRATION_TYPE_MISMATCH", UNPROCESSABLE_ENTITY, "Integration type in request body does not match the actual one"),

    // integration type
    IntegrationTypeNotFound => ("E_INTEGRATION_TYPE_NOT_FOUND", NOT_FOUND, "Requested integration type does not exists"),
    IntegrationTypeExists => ("E_INTEGRATION_TYPE_EXISTS", CONFLICT, "Integration with this type already exists"),
    IntegrationTypeInUseBy => ("E_INTEGRATION_TYPE_IN_USE_BY", CONFLICT, "Integration type is in use by"),

    // crash / statistics
    CrashNotFound => ("E_CRASH_NOT_FOUND", NOT_FOUND, "Requested crash does not exist"),
    StatisticsNotFound => ("E_STATISTICS_NOT_FOUND", NOT_FOUND, "Requested statistics record does not exist"),

    // external service passthrough
    ExternalServiceError => ("E_EXTERNAL_SERVICE_ERROR", INTERNAL_SERVER_ERROR, "An upstream service returned an error"),

    // files
    UploadFailure => ("E_UPLOAD_FAILURE", INTERNAL_SERVER_ERROR, "Failed to upload file. Re-upload required"),
    FileNotFound => ("E_FILE_NOT_FOUND", NOT_FOUND, "Requested file does not exist"),
    FileTooLarge => ("E_FILE_TOO_LARGE", PAYLOAD_TOO_LARGE, "Provided file is too large. Please, fit into upload limit"),
    FileNotArchive => ("E_FILE_NOT_ARCHIVE", UNPROCESSABLE_ENTITY, "Provided file is not recognized as archive. Please, ensure you're uploading '.tar.gz' file"),
    JsonFileIsInvalid => ("E_JSON_FILE_IS_INVALID", UNPROCESSABLE_ENTITY, "Provided file is not recognized as json. Please, ensure you're uploading valid '.json' file"),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(ErrorCode::UserNotFound.as_str(), "E_USER_NOT_FOUND");
        assert_eq!(ErrorCode::FileTooLarge.status(), PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorCode::LoginFailed.status(), UNAUTHORIZED);
    }
}
