// src/links.rs
//! Browser links to TeamForge objects

/// Link that redirects to any object by id
pub fn object_url(server_url: &str, id: &str) -> String {
    format!("{}/sf/go/{}", server_url, id)
}

/// Release page, from a release's path (e.g. `projects.p/frs.pkg.rel`)
pub fn release_url(server_url: &str, release_path: &str) -> String {
    format!("{}/sf/frs/do/viewRelease/{}", server_url, release_path)
}

/// Direct download of a release file, from the file's path
pub fn download_url(server_url: &str, file_path: &str) -> String {
    format!("{}/sf/frs/do/downloadFile/{}", server_url, file_path)
}

/// Document listing of a folder, from the folder's path
pub fn documents_url(server_url: &str, folder_path: &str) -> String {
    format!("{}/sf/docman/do/listDocuments/{}", server_url, folder_path)
}
