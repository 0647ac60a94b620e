pub mod audit;
pub mod cache;
pub mod catalog;
pub mod crop;
pub mod gallery_service;
pub mod local_storage;
pub mod media_repository;
pub mod media_service;
pub mod storage;
pub mod tag_service;
pub mod variant_deriver;
pub mod variant_store;
