use edu_portal::storage::{MockStorageService, S3StorageClient, StorageService, secure_filename};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_upload_keeps_bytes_and_content_type() {
        let mock = MockStorageService::new();
        let result = mock
            .upload("videos/cours.mp4", b"frames".to_vec(), "video/mp4")
            .await;
        assert!(result.is_ok());

        let stored = mock.object("videos/cours.mp4").await.unwrap();
        assert_eq!(stored.bytes, b"frames");
        assert_eq!(stored.content_type, "video/mp4");
        assert_eq!(mock.upload_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.upload("videos/cours.mp4", vec![1, 2, 3], "video/mp4").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("videos/cours.mp4"));
        assert_eq!(mock.object_count().await, 0);
        assert_eq!(mock.upload_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_mock_clones_share_objects() {
        let mock = MockStorageService::new();
        let handle = mock.clone();

        mock.upload("audios/a.mp3", vec![0], "audio/mpeg").await.unwrap();
        assert!(handle.object("audios/a.mp3").await.is_some());

        handle.delete("audios/a.mp3").await.unwrap();
        assert_eq!(mock.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_mock_exists_tracks_uploads_and_deletes() {
        let mock = MockStorageService::new();
        assert!(!mock.exists("enonces/sujet.pdf").await.unwrap());

        mock.upload("enonces/sujet.pdf", vec![1], "application/pdf").await.unwrap();
        assert!(mock.exists("enonces/sujet.pdf").await.unwrap());

        mock.delete("enonces/sujet.pdf").await.unwrap();
        assert!(!mock.exists("enonces/sujet.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_delete_unknown_key_is_ok() {
        let mock = MockStorageService::new();
        assert!(mock.delete("enonces/missing.pdf").await.is_ok());
    }
}

#[cfg(test)]
mod filename_tests {
    use super::*;

    #[test]
    fn test_plain_names_are_kept() {
        assert_eq!(secure_filename("sujet.pdf"), "sujet.pdf");
        assert_eq!(secure_filename("chap-2_v3.tar.gz"), "chap-2_v3.tar.gz");
    }

    #[test]
    fn test_whitespace_becomes_underscore() {
        assert_eq!(secure_filename("devoir 1.pdf"), "devoir_1.pdf");
        assert_eq!(secure_filename("  cours   de  maths.pdf "), "cours_de_maths.pdf");
    }

    #[test]
    fn test_directories_are_flattened() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\eleve\\notes.txt"), "C_Users_eleve_notes.txt");
        assert_eq!(secure_filename("/absolute/path.pdf"), "absolute_path.pdf");
    }

    #[test]
    fn test_accents_are_folded_to_ascii() {
        assert_eq!(secure_filename("énoncé maths.pdf"), "enonce_maths.pdf");
        assert_eq!(secure_filename("Corrigé ÉLÈVE.pdf"), "Corrige_ELEVE.pdf");
        assert_eq!(secure_filename("éàü"), "eau");
    }

    #[test]
    fn test_other_characters_are_dropped() {
        assert_eq!(secure_filename("cours<script>.pdf"), "coursscript.pdf");
        assert_eq!(secure_filename("leçon_日本.pdf"), "lecon_.pdf");
    }

    #[test]
    fn test_leading_dots_and_underscores_are_trimmed() {
        assert_eq!(secure_filename(".bashrc"), "bashrc");
        assert_eq!(secure_filename("__init__.py"), "init__.py");
    }

    #[test]
    fn test_nothing_usable_gives_empty() {
        assert_eq!(secure_filename(""), "");
        assert_eq!(secure_filename("../.."), "");
        assert_eq!(secure_filename("日本語"), "");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_client_creation() {
        let client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;
        assert_eq!(client.bucket_name(), "testbucket");
    }
}
