//! End-to-end scenarios for page files across open/close cycles

#[cfg(test)]
mod tests {
    use crate::file::{
        FileError, HEADER_SIZE, PAGE_SIZE, PagedFileManager, close_page_file, create_page_file,
        destroy_page_file, open_page_file,
    };
    use tempfile::TempDir;

    #[test]
    fn test_header_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");

        create_page_file(&path).unwrap();
        let mut handle = open_page_file(&path).unwrap();
        assert_eq!(handle.total_pages(), 1);

        for _ in 0..3 {
            handle.append_empty_block().unwrap();
        }
        close_page_file(&mut handle).unwrap();

        let mut handle = open_page_file(&path).unwrap();
        assert_eq!(handle.total_pages(), 4);
        assert_eq!(handle.get_block_pos().unwrap(), 0);
        handle.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (HEADER_SIZE + 4 * PAGE_SIZE) as u64);
    }

    #[test]
    fn test_page_contents_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("t1");

        create_page_file(&path).unwrap();
        let mut handle = open_page_file(&path).unwrap();
        assert_eq!(handle.total_pages(), 1);
        handle.write_block(0, &vec![b'A'; PAGE_SIZE]).unwrap();
        handle.close().unwrap();

        let mut handle = open_page_file(&path).unwrap();
        assert_eq!(handle.read_block(0).unwrap(), vec![b'A'; PAGE_SIZE]);
        handle.close().unwrap();
    }

    #[test]
    fn test_round_trip_every_page() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pages.db");
        let manager = PagedFileManager::new();

        manager.create_file(&path).unwrap();
        let mut handle = manager.open_file(&path).unwrap();
        handle.ensure_capacity(8).unwrap();

        let page_for = |i: usize| -> Vec<u8> {
            (0..PAGE_SIZE)
                .map(|j| match (i + j) % 3 {
                    0 => 0x00,
                    1 => 0xFF,
                    _ => (i * 31 + j) as u8,
                })
                .collect()
        };

        for i in 0..8 {
            handle.write_block(i, &page_for(i)).unwrap();
        }
        manager.close_file(&mut handle).unwrap();

        let mut handle = manager.open_file(&path).unwrap();
        for i in 0..8 {
            assert_eq!(handle.read_block(i).unwrap(), page_for(i), "page {i}");
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        handle.read_last_block().unwrap();
        handle.read_block_into(3, &mut buffer).unwrap();
        assert_eq!(buffer, page_for(3));
        assert_eq!(handle.get_block_pos().unwrap(), 3);
        manager.close_file(&mut handle).unwrap();
    }

    #[test]
    fn test_cursor_walk_matches_indexed_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("walk.db");

        create_page_file(&path).unwrap();
        let mut handle = open_page_file(&path).unwrap();
        handle.ensure_capacity(3).unwrap();
        handle.write_block(2, &vec![0x22; PAGE_SIZE]).unwrap();

        handle.read_first_block().unwrap();
        handle.read_next_block().unwrap();
        let page = handle.read_next_block().unwrap();
        assert_eq!(handle.get_block_pos().unwrap(), 2);
        assert_eq!(page, handle.read_block(2).unwrap());

        handle.read_first_block().unwrap();
        assert!(matches!(
            handle.read_previous_block(),
            Err(FileError::PageNotFound { .. })
        ));
        handle.close().unwrap();
    }

    #[test]
    fn test_growth_is_monotonic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grow.db");

        create_page_file(&path).unwrap();
        let mut handle = open_page_file(&path).unwrap();
        for target in [4, 2, 4, 10, 1, 0] {
            let before = handle.total_pages();
            handle.ensure_capacity(target).unwrap();
            assert!(handle.total_pages() >= target);
            assert_eq!(handle.total_pages(), before.max(target));
        }
        handle.close().unwrap();

        let handle = open_page_file(&path).unwrap();
        assert_eq!(handle.total_pages(), 10);
    }

    #[test]
    fn test_destroy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.db");

        let result = destroy_page_file(&path);
        assert!(matches!(result, Err(FileError::FileNotFound(_))));
        assert!(!path.exists());

        create_page_file(&path).unwrap();
        destroy_page_file(&path).unwrap();
        assert!(!path.exists());
        assert!(matches!(
            open_page_file(&path),
            Err(FileError::FileNotFound(_))
        ));
    }
}
