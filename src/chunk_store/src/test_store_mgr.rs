use super::*;
use chunk_lib::{
    decode_elements, BinaryConfig, Chunk, ChunkError, DiskHandler, FileChunk, FileMode,
    GzipConfig, Layout, MemoryObjectStore, ObjectStoreHandler,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

type DiskStore = FileChunkStore<f64, DiskHandler<BinaryConfig>>;

fn create_disk_store(dir: &Path, pool_size: PoolSize) -> DiskStore {
    let mut store = file_chunk_store(
        &[4, 4],
        &[2, 2],
        dir.join("data").to_str().unwrap(),
        pool_size,
        DiskHandler::new(BinaryConfig::default()),
        None,
    )
    .unwrap();
    store.set_temp_root(dir.join("tmp"));
    store
}

fn read_chunk_file(path: &str) -> Vec<f64> {
    let bytes = fs::read(path).unwrap();
    decode_elements(&bytes, false).unwrap()
}

#[test]
fn test_hit_returns_same_slot() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = create_disk_store(temp_dir.path(), PoolSize::Bounded(2));

    store.resolve(&[1, 0]).unwrap().set(&[0, 0], 1.5).unwrap();
    let slot = store.slot_of(&[1, 0]).unwrap();
    let cursor = store.unload_index();

    for _ in 0..3 {
        let chunk = store.resolve(&[1, 0]).unwrap();
        assert_eq!(chunk.get(&[0, 0]).unwrap(), 1.5);
        assert_eq!(store.slot_of(&[1, 0]), Some(slot));
    }
    assert_eq!(store.unload_index(), cursor);
}

#[test]
fn test_coordinate_resident_once() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = create_disk_store(temp_dir.path(), PoolSize::Bounded(3));

    let sequence = [[0, 0], [0, 1], [0, 0], [1, 1], [1, 0], [0, 1], [0, 0], [1, 0]];
    for coord in sequence.iter() {
        store.resolve(coord).unwrap();
        let resident = store.resident_coordinates();
        let mut unique = resident.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), resident.len(), "duplicate tag in {:?}", resident);
        assert!(resident.len() <= store.pool_size());
    }
}

#[test]
fn test_round_robin_eviction_order() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = create_disk_store(temp_dir.path(), PoolSize::Bounded(2));

    store.resolve(&[0, 0]).unwrap();
    store.resolve(&[0, 1]).unwrap();
    assert_eq!(store.slot_of(&[0, 0]), Some(0));
    assert_eq!(store.slot_of(&[0, 1]), Some(1));
    assert_eq!(store.unload_index(), 0);

    // misses on a full pool walk the slots in order
    store.resolve(&[1, 0]).unwrap();
    assert_eq!(store.slot_of(&[1, 0]), Some(0));
    assert_eq!(store.slot_of(&[0, 0]), None);
    assert_eq!(store.unload_index(), 1);

    store.resolve(&[1, 1]).unwrap();
    assert_eq!(store.slot_of(&[1, 1]), Some(1));
    assert_eq!(store.unload_index(), 0);

    store.resolve(&[0, 0]).unwrap();
    assert_eq!(store.slot_of(&[0, 0]), Some(0));
    assert_eq!(store.unload_index(), 1);
}

#[test]
fn test_eviction_writes_back_dirty_chunk() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = create_disk_store(temp_dir.path(), PoolSize::Bounded(2));

    // (2,1) lands in chunk (1,0) at local (0,1)
    store.resolve(&[1, 0]).unwrap().set(&[0, 1], 3.4).unwrap();
    // (1,2) lands in chunk (0,1) at local (1,0)
    store.resolve(&[0, 1]).unwrap().set(&[1, 0], 5.6).unwrap();

    let path_10 = store.path_translator().coordinate_to_path(&[1, 0]);
    let path_01 = store.path_translator().coordinate_to_path(&[0, 1]);
    assert!(!Path::new(&path_10).exists());

    // pool full, cursor at 0: chunk (1,0) is evicted for (0,0)
    store.resolve(&[0, 0]).unwrap().set(&[0, 0], 7.8).unwrap();
    assert_eq!(store.slot_of(&[0, 0]), Some(0));
    assert_eq!(store.slot_of(&[1, 0]), None);

    let persisted = read_chunk_file(&path_10);
    assert_eq!(persisted, vec![0.0, 3.4, 0.0, 0.0]);

    // chunk (0,1) only lives in memory until flushed
    assert!(!Path::new(&path_01).exists());
    assert_eq!(store.resolve(&[0, 1]).unwrap().get(&[1, 0]).unwrap(), 5.6);
    assert_eq!(store.resolve(&[0, 0]).unwrap().get(&[0, 0]).unwrap(), 7.8);

    store.flush().unwrap();
    let flushed = read_chunk_file(&path_01);
    assert_eq!(flushed[2], 5.6);

    // evicted chunk reloads from storage
    assert_eq!(store.resolve(&[1, 0]).unwrap().get(&[0, 1]).unwrap(), 3.4);
}

#[test]
fn test_failed_eviction_keeps_slot() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    // a regular file where the store's parent directory should be
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"not a dir").unwrap();
    let prototype = FileChunk::<f64, _>::new(
        DiskHandler::new(BinaryConfig::default()),
        FileMode::Init,
    );
    let mut store = ChunkStoreManager::<_, DotPathTranslator>::new(
        &[4, 4],
        &[2, 2],
        blocker.join("data").to_str().unwrap(),
        PoolSize::Bounded(2),
        Layout::RowMajor,
        prototype,
    )
    .unwrap();

    store.resolve(&[0, 0]).unwrap().set(&[0, 0], 3.0).unwrap();
    store.resolve(&[0, 1]).unwrap();
    assert_eq!(store.unload_index(), 0);

    let err = store.resolve(&[1, 0]).unwrap_err();
    assert!(matches!(err, ChunkError::IoError(_)));
    assert_eq!(store.slot_of(&[0, 0]), Some(0));
    assert_eq!(store.slot_of(&[1, 0]), None);
    assert_eq!(store.unload_index(), 0);

    // the dirty contents are still served from the slot
    let chunk = store.resolve(&[0, 0]).unwrap();
    assert!(chunk.is_dirty());
    assert_eq!(chunk.get(&[0, 0]).unwrap(), 3.0);
}

#[test]
fn test_values_survive_new_manager() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    {
        let mut array = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(1)));
        array
            .fill_with(|index| (index[0] * 10 + index[1]) as f64)
            .unwrap();
        array.chunks_mut().flush().unwrap();
    }

    let mut reopened = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(2)));
    for index in reopened.indices() {
        let expected = (index[0] * 10 + index[1]) as f64;
        assert_eq!(reopened.get(&index).unwrap(), expected);
    }
}

#[test]
fn test_resize_keeps_pool() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = create_disk_store(temp_dir.path(), PoolSize::Bounded(2));
    store.resolve(&[0, 0]).unwrap().set(&[1, 1], 2.5).unwrap();
    store.resolve(&[0, 1]).unwrap();
    store.resolve(&[1, 1]).unwrap();
    let cursor = store.unload_index();
    let resident = store.resident_coordinates();

    store.resize(&[10, 10]);
    assert_eq!(store.shape(), &[10, 10]);
    assert_eq!(store.grid_shape(), vec![5, 5]);
    assert_eq!(store.pool_size(), 2);
    assert_eq!(store.unload_index(), cursor);
    assert_eq!(store.resident_coordinates(), resident);

    store.resolve(&[4, 4]).unwrap().set(&[0, 0], 9.0).unwrap();
    assert_eq!(store.resolve(&[4, 4]).unwrap().get(&[0, 0]).unwrap(), 9.0);
}

#[test]
fn test_scalar_store_uses_slot_zero() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("scalar_store");
    let mut store: DiskStore = file_chunk_store(
        &[],
        &[],
        dir.to_str().unwrap(),
        PoolSize::Bounded(3),
        DiskHandler::new(BinaryConfig::default()),
        None,
    )
    .unwrap();

    let scalar_path = store.path_translator().coordinate_to_path(&[]);
    assert_eq!(store.chunk(0).unwrap().path(), scalar_path);
    assert_eq!(store.chunk_count(), Some(1));

    store.resolve(&[]).unwrap().set(&[], 42.0).unwrap();
    assert_eq!(store.slot_of(&[]), Some(0));
    assert_eq!(store.unload_index(), 0);
    assert!(store.resident_coordinates().is_empty());

    store.flush().unwrap();
    assert_eq!(read_chunk_file(&scalar_path), vec![42.0]);

    let mut array = ChunkedArray::new(store);
    assert_eq!(array.get(&[]).unwrap(), 42.0);
    assert_eq!(array.to_vec().unwrap(), vec![42.0]);
}

#[test]
fn test_chunked_array_bounds() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut array = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(1)));
    assert_eq!(array.size(), Some(16));
    assert!(matches!(array.get(&[4, 0]), Err(ChunkError::OutOfBounds(_))));
    assert!(matches!(array.set(&[0], 1.0), Err(ChunkError::OutOfBounds(_))));
}

#[test]
fn test_assign_from_replaces_contents() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut target = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(2)));
    target.fill_with(|_| -1.0).unwrap();
    target.chunks_mut().flush().unwrap();
    // leave a resident slot behind to check it does not serve old data
    assert_eq!(target.get(&[3, 3]).unwrap(), -1.0);

    let source_dir = temp_dir.path().join("source");
    let mut source = ChunkedArray::new(
        file_chunk_store::<f64, _>(
            &[4, 4],
            &[2, 2],
            source_dir.to_str().unwrap(),
            PoolSize::FullResidency,
            DiskHandler::new(BinaryConfig::default()),
            None,
        )
        .unwrap(),
    );
    source
        .fill_with(|index| (index[0] + index[1]) as f64 * 0.5)
        .unwrap();

    target.assign_from(&mut source).unwrap();
    assert_eq!(target.chunks().unload_index(), 0);
    for index in target.indices() {
        let expected = (index[0] + index[1]) as f64 * 0.5;
        assert_eq!(target.get(&index).unwrap(), expected);
    }

    // the replacement directory was moved, not copied
    let tmp_root = temp_dir.path().join("tmp");
    assert_eq!(fs::read_dir(&tmp_root).unwrap().count(), 0);
    let path_11 = target.chunks().path_translator().coordinate_to_path(&[1, 1]);
    assert_eq!(read_chunk_file(&path_11), vec![2.0, 2.5, 2.5, 3.0]);
}

#[test]
fn test_assign_from_new_shape() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut target = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(1)));

    let mut source = ChunkedArray::new(
        file_chunk_store::<f64, _>(
            &[3, 5],
            &[3, 1],
            temp_dir.path().join("narrow").to_str().unwrap(),
            PoolSize::Bounded(2),
            DiskHandler::new(BinaryConfig::default()),
            Some(2.0),
        )
        .unwrap(),
    );
    source.set(&[2, 4], 8.0).unwrap();

    target.assign_from(&mut source).unwrap();
    assert_eq!(target.shape(), &[3, 5]);
    assert_eq!(target.chunk_shape(), &[2, 2]);
    assert_eq!(target.get(&[0, 0]).unwrap(), 2.0);
    assert_eq!(target.get(&[2, 4]).unwrap(), 8.0);
}

#[test]
fn test_failed_assign_removes_temporary_directory() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut target = ChunkedArray::new(create_disk_store(temp_dir.path(), PoolSize::Bounded(1)));
    target.set(&[1, 1], 4.0).unwrap();
    target.chunks_mut().flush().unwrap();

    // one dimension against a two dimensional chunk shape
    let mut source = ChunkedArray::new(
        file_chunk_store::<f64, _>(
            &[4],
            &[2],
            temp_dir.path().join("line").to_str().unwrap(),
            PoolSize::Bounded(1),
            DiskHandler::new(BinaryConfig::default()),
            None,
        )
        .unwrap(),
    );
    let err = target.assign_from(&mut source).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidConfig(_)));

    let tmp_root = temp_dir.path().join("tmp");
    assert_eq!(fs::read_dir(&tmp_root).unwrap().count(), 0);
    assert_eq!(target.shape(), &[4, 4]);
    assert_eq!(target.get(&[1, 1]).unwrap(), 4.0);
}

#[test]
fn test_object_store_backend() {
    init_logging();
    let objects = Arc::new(MemoryObjectStore::new());
    let handler = ObjectStoreHandler::new(objects.clone(), BinaryConfig::default());
    let store = file_chunk_store::<i32, _>(
        &[6],
        &[2],
        "arrays/counts",
        PoolSize::Bounded(1),
        handler,
        None,
    )
    .unwrap();
    let mut array = ChunkedArray::new(store);

    array.fill_with(|index| index[0] as i32 * 3).unwrap();
    array.chunks_mut().flush().unwrap();

    let keys = objects.list_objects("arrays").unwrap();
    assert_eq!(keys, vec!["counts/0", "counts/1", "counts/2"]);
    let raw = objects.get_object("arrays", "counts/2").unwrap().unwrap();
    assert_eq!(decode_elements::<i32>(&raw, false).unwrap(), vec![12, 15]);

    assert_eq!(array.to_vec().unwrap(), vec![0, 3, 6, 9, 12, 15]);
}

#[test]
fn test_configure_format_reaches_every_chunk() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut store = file_chunk_store::<u16, _>(
        &[4],
        &[2],
        temp_dir.path().join("data").to_str().unwrap(),
        PoolSize::Bounded(2),
        DiskHandler::new(BinaryConfig::default()),
        None,
    )
    .unwrap();
    store.set_temp_root(temp_dir.path().join("tmp"));

    store.configure_format(&BinaryConfig { big_endian: true });
    store.resolve(&[0]).unwrap().set(&[1], 0x0102).unwrap();
    store.resolve(&[1]).unwrap().set(&[0], 0x0304).unwrap();
    store.flush().unwrap();

    let path_0 = store.path_translator().coordinate_to_path(&[0]);
    let path_1 = store.path_translator().coordinate_to_path(&[1]);
    assert_eq!(fs::read(path_0).unwrap(), vec![0, 0, 1, 2]);
    assert_eq!(fs::read(path_1).unwrap(), vec![3, 4, 0, 0]);

    // stores built from this one inherit the format
    let fresh_dir = temp_dir.path().join("fresh");
    let mut fresh = store.fresh_store(&[2], fresh_dir.to_str().unwrap()).unwrap();
    fresh.resolve(&[0]).unwrap().set(&[0], 0x0506).unwrap();
    fresh.flush().unwrap();
    let fresh_path = fresh.path_translator().coordinate_to_path(&[0]);
    assert_eq!(fs::read(fresh_path).unwrap(), vec![5, 6, 0, 0]);
}

#[test]
fn test_gzip_store_round_trip() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("gz");
    {
        let mut store = file_chunk_store::<f32, _>(
            &[4, 4],
            &[2, 2],
            dir.to_str().unwrap(),
            PoolSize::Bounded(1),
            DiskHandler::new(GzipConfig::default()),
            None,
        )
        .unwrap();
        store.resolve(&[1, 1]).unwrap().set(&[1, 1], 0.25).unwrap();
        store.resolve(&[0, 0]).unwrap();
        store.flush().unwrap();
    }

    let mut reopened = file_chunk_store::<f32, _>(
        &[4, 4],
        &[2, 2],
        dir.to_str().unwrap(),
        PoolSize::Bounded(1),
        DiskHandler::new(GzipConfig::default()),
        None,
    )
    .unwrap();
    assert_eq!(reopened.resolve(&[1, 1]).unwrap().get(&[1, 1]).unwrap(), 0.25);
}

#[test]
fn test_init_value_for_missing_chunks() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut array = ChunkedArray::new(
        file_chunk_store::<i64, _>(
            &[3, 3],
            &[2, 2],
            temp_dir.path().join("data").to_str().unwrap(),
            PoolSize::Bounded(1),
            DiskHandler::new(BinaryConfig::default()),
            Some(-7),
        )
        .unwrap(),
    );
    assert!(array.to_vec().unwrap().iter().all(|v| *v == -7));

    // untouched chunks are never written
    array.chunks_mut().flush().unwrap();
    assert!(!temp_dir.path().join("data").exists());
}

#[test]
fn test_store_from_saved_config() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let mut config = ChunkStoreConfig::new(
        &[4, 6],
        &[2, 3],
        temp_dir.path().join("data").to_str().unwrap(),
    );
    config.pool_size = PoolSize::FullResidency;
    config.layout = Layout::ColumnMajor;
    config.temp_root = Some(temp_dir.path().join("tmp"));
    let config_path = temp_dir.path().join(STORE_CONFIG_FILE_NAME);
    config.save(&config_path).unwrap();

    let loaded = ChunkStoreConfig::load(&config_path).unwrap();
    let prototype = FileChunk::<u8, _>::new(
        DiskHandler::new(BinaryConfig::default()),
        FileMode::InitOnFail,
    );
    let mut store = ChunkStoreManager::<_, DotPathTranslator>::from_config(&loaded, prototype).unwrap();
    assert_eq!(store.pool_size(), 4);
    assert_eq!(store.layout(), Layout::ColumnMajor);
    let mut expected = config.clone();
    expected.directory.push('/');
    assert_eq!(store.config(), expected);

    // column-major: local (1,0) is the second element on disk
    store.resolve(&[0, 0]).unwrap().set(&[1, 0], 9).unwrap();
    store.flush().unwrap();
    let path = store.path_translator().coordinate_to_path(&[0, 0]);
    assert_eq!(fs::read(path).unwrap(), vec![0, 9, 0, 0, 0, 0]);
}

#[test]
fn test_load_mode_reports_missing_chunk() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let prototype = FileChunk::<f64, _>::new(
        DiskHandler::new(BinaryConfig::default()),
        FileMode::Load,
    );
    let mut store = ChunkStoreManager::<_, DotPathTranslator>::new(
        &[4, 4],
        &[2, 2],
        temp_dir.path().to_str().unwrap(),
        PoolSize::Bounded(1),
        Layout::RowMajor,
        prototype,
    )
    .unwrap();
    let err = store.resolve(&[1, 1]).unwrap().get(&[0, 0]).unwrap_err();
    assert!(err.is_not_found());
}
