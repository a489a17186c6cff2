use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_inventory_records_table::Migration),
            Box::new(m20240101_000002_create_stock_batches_table::Migration),
            Box::new(m20240101_000003_create_stock_requests_table::Migration),
            Box::new(m20240101_000004_create_stock_transfers_table::Migration),
            Box::new(m20240101_000005_create_dispatch_notes_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_inventory_records_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_inventory_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryRecords::Id)
                                .big_integer()
                                .auto_increment()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::Location)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::ProductId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::ReorderLevel)
                                .integer()
                                .not_null()
                                .default(10),
                        )
                        .col(ColumnDef::new(InventoryRecords::History).json().not_null())
                        .col(
                            ColumnDef::new(InventoryRecords::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_records_location_product")
                        .table(InventoryRecords::Table)
                        .col(InventoryRecords::Location)
                        .col(InventoryRecords::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_records_location")
                        .table(InventoryRecords::Table)
                        .col(InventoryRecords::Location)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryRecords::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum InventoryRecords {
        Table,
        Id,
        Location,
        ProductId,
        Quantity,
        ReservedQuantity,
        ReorderLevel,
        History,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockBatches::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockBatches::ProductId).string().not_null())
                        .col(
                            ColumnDef::new(StockBatches::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockBatches::BatchNo).string().not_null())
                        .col(ColumnDef::new(StockBatches::CartonNo).string().null())
                        .col(ColumnDef::new(StockBatches::Expiry).date().null())
                        .col(ColumnDef::new(StockBatches::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(StockBatches::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::TotalCartons)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockBatches::Location).string().not_null())
                        .col(ColumnDef::new(StockBatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(StockBatches::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_batches_location_product")
                        .table(StockBatches::Table)
                        .col(StockBatches::Location)
                        .col(StockBatches::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_batches_expiry")
                        .table(StockBatches::Table)
                        .col(StockBatches::Expiry)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockBatches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockBatches {
        Table,
        Id,
        ProductId,
        Description,
        BatchNo,
        CartonNo,
        Expiry,
        Quantity,
        RemainingQuantity,
        TotalCartons,
        Location,
        Status,
        Barcode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_stock_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRequests::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequests::RequestNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(StockRequests::RequestingBranch)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequests::RequestType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequests::Priority).string().not_null())
                        .col(ColumnDef::new(StockRequests::Status).string().not_null())
                        .col(ColumnDef::new(StockRequests::Items).json().not_null())
                        .col(ColumnDef::new(StockRequests::Notes).string().null())
                        .col(ColumnDef::new(StockRequests::ReturnDate).date().null())
                        .col(ColumnDef::new(StockRequests::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(StockRequests::CreatedByRole)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRequests::ReviewedBy).string().null())
                        .col(
                            ColumnDef::new(StockRequests::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockRequests::ApprovedBy).string().null())
                        .col(
                            ColumnDef::new(StockRequests::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockRequests::RejectedBy).string().null())
                        .col(
                            ColumnDef::new(StockRequests::RejectedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockRequests::Approvals).json().not_null())
                        .col(ColumnDef::new(StockRequests::History).json().not_null())
                        .col(
                            ColumnDef::new(StockRequests::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(StockRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_requests_branch")
                        .table(StockRequests::Table)
                        .col(StockRequests::RequestingBranch)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_requests_status")
                        .table(StockRequests::Table)
                        .col(StockRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRequests::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockRequests {
        Table,
        Id,
        RequestNumber,
        RequestingBranch,
        RequestType,
        Priority,
        Status,
        Items,
        Notes,
        ReturnDate,
        CreatedBy,
        CreatedByRole,
        ReviewedBy,
        ReviewedAt,
        ApprovedBy,
        ApprovedAt,
        RejectedBy,
        RejectedAt,
        Approvals,
        History,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_stock_transfers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_stock_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransfers::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::RequestId).string().null())
                        .col(
                            ColumnDef::new(StockTransfers::RequestNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::FromWarehouse)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::ToBranch).string().not_null())
                        .col(ColumnDef::new(StockTransfers::Status).string().not_null())
                        .col(ColumnDef::new(StockTransfers::Items).json().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::DispatchNotes)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::DispatchedBy).string().null())
                        .col(
                            ColumnDef::new(StockTransfers::DispatchedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransfers::DeliveredBy).string().null())
                        .col(
                            ColumnDef::new(StockTransfers::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransfers::ReceivedBy).string().null())
                        .col(
                            ColumnDef::new(StockTransfers::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransfers::CancelledBy).string().null())
                        .col(
                            ColumnDef::new(StockTransfers::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransfers::CancelReason).string().null())
                        .col(ColumnDef::new(StockTransfers::History).json().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_status")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_to_branch")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::ToBranch)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_request_id")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::RequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockTransfers {
        Table,
        Id,
        RequestId,
        RequestNumber,
        FromWarehouse,
        ToBranch,
        Status,
        Items,
        DispatchNotes,
        CreatedBy,
        DispatchedBy,
        DispatchedAt,
        DeliveredBy,
        DeliveredAt,
        ReceivedBy,
        ReceivedAt,
        CancelledBy,
        CancelledAt,
        CancelReason,
        History,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_dispatch_notes_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_dispatch_notes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DispatchNotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DispatchNotes::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::TransferId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(DispatchNotes::RequestId).string().null())
                        .col(ColumnDef::new(DispatchNotes::RequestNumber).string().null())
                        .col(
                            ColumnDef::new(DispatchNotes::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::FromWarehouse)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DispatchNotes::ToBranch).string().not_null())
                        .col(ColumnDef::new(DispatchNotes::Items).json().not_null())
                        .col(ColumnDef::new(DispatchNotes::Status).string().not_null())
                        .col(
                            ColumnDef::new(DispatchNotes::ExpectedArrival)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::DispatchedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::DispatchedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DispatchNotes::ReceivedBy).string().null())
                        .col(
                            ColumnDef::new(DispatchNotes::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DispatchNotes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dispatch_notes_status")
                        .table(DispatchNotes::Table)
                        .col(DispatchNotes::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DispatchNotes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DispatchNotes {
        Table,
        Id,
        TransferId,
        RequestId,
        RequestNumber,
        Barcode,
        FromWarehouse,
        ToBranch,
        Items,
        Status,
        ExpectedArrival,
        DispatchedBy,
        DispatchedAt,
        ReceivedBy,
        ReceivedAt,
        CreatedAt,
        UpdatedAt,
    }
}
