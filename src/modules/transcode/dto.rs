use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Video bitrate override, e.g. `200K` or `1M`
    #[validate(length(min = 1, max = 12, message = "bitrate must be 1 to 12 characters"))]
    pub bitrate: Option<String>,
    /// Output container override: mp4, webm, mkv or mov
    #[validate(length(min = 1, max = 8, message = "format must be 1 to 8 characters"))]
    pub format: Option<String>,
}
