pub mod integrity_record;
