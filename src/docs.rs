use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::transcode::handler::landing_page,
        crate::modules::transcode::handler::upload,
    ),
    tags(
        (name = "Transcode", description = "Upload a video and get it back at the configured bitrate")
    )
)]
pub struct ApiDoc;
