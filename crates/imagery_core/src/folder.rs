//! Id-derived storage locations.

use uuid::Uuid;

/// Separates the stem from size and fit in derived-variant filenames.
///
/// Originals never contain it, which is how cache purges tell them apart.
pub const VARIANT_SEPARATOR: char = '_';

/// Split an image id into its shard folder and filename stem.
///
/// The stem is the 32-character lowercase hex form of the id. The folder is
/// two levels deep, `{stem[0..2]}/{stem[2..4]}`, which keeps any one directory
/// small no matter how many images are stored.
///
/// # Examples
///
/// ```
/// use imagery_core::id_to_folder;
/// use uuid::Uuid;
///
/// let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
/// let (folder, stem) = id_to_folder(&id);
/// assert_eq!(folder, "a1/b2");
/// assert_eq!(stem, "a1b2c3d4000040008000000000000000");
/// ```
pub fn id_to_folder(id: &Uuid) -> (String, String) {
    let stem = id.simple().to_string();
    let folder = format!("{}/{}", &stem[0..2], &stem[2..4]);
    (folder, stem)
}
