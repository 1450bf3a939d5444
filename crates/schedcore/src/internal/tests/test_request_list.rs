use crate::internal::common::ids::{AutoclusterId, JobId};
use crate::internal::config::ParamTable;
use crate::internal::messages::negotiate::ToScheddMessage;
use crate::internal::negotiate::requestlist::{FetchErrorKind, PrefetchStatus, ResourceRequestList};
use crate::internal::tests::utils::job::{JobBuilder, jobs_in_autoclusters};
use crate::internal::tests::utils::schedd::MockSchedd;

fn batched(batch_size: u32) -> ResourceRequestList {
    let mut list = ResourceRequestList::new(1);
    list.configure(batch_size, true);
    list
}

async fn next_cluster(list: &mut ResourceRequestList, schedd: &mut MockSchedd) -> Option<i32> {
    list.get_request(schedd)
        .await
        .unwrap()
        .map(|request| request.job_id.cluster().as_num())
}

#[tokio::test]
async fn test_requests_in_fetch_order() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 2, 3, 4, 5]));
    let mut list = batched(3);

    let mut clusters = Vec::new();
    while let Some(cluster) = next_cluster(&mut list, &mut schedd).await {
        clusters.push(cluster);
    }
    assert_eq!(clusters, vec![1, 2, 3, 4, 5]);
    assert_eq!(list.round_trips(), 2);
    assert_eq!(list.requests_fetched(), 5);
    assert_eq!(
        schedd.sent(),
        &[
            ToScheddMessage::SendResourceRequestList { count: 3 },
            ToScheddMessage::SendResourceRequestList { count: 3 }
        ]
    );

    // Exhausted schedd is not asked again
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert_eq!(schedd.request_count(), 2);
    assert!(!list.had_error());
}

#[tokio::test]
async fn test_request_fields() {
    let mut schedd = MockSchedd::new(vec![JobBuilder::new(12, 3).autocluster(8).build()]);
    let mut list = batched(10);
    let request = list.get_request(&mut schedd).await.unwrap().unwrap();
    assert_eq!(request.job_id, JobId::new(12.into(), 3.into()));
    assert_eq!(request.autocluster, Some(AutoclusterId::new(8)));
    assert_eq!(request.ad.eval_integer("ClusterId", 0), Some(12));
}

#[tokio::test]
async fn test_rejected_autocluster_is_never_offered_again() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 2, 2, 3, 2]));
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
    list.no_match_found();
    assert!(list.is_rejected(AutoclusterId::new(2)));

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(4));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
}

#[tokio::test]
async fn test_fetches_until_non_rejected_request() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 1, 1, 1, 2]));
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    list.no_match_found();
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(5));
    assert_eq!(list.round_trips(), 3);
    assert_eq!(schedd.remaining_ads(), 0);
}

#[tokio::test]
async fn test_only_rejected_requests_left() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 1, 1]));
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    list.no_match_found();
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert!(!list.had_error());
}

#[tokio::test]
async fn test_requests_without_autocluster_are_not_rejected() {
    let mut schedd = MockSchedd::new(vec![
        JobBuilder::new(1, 0).build(),
        JobBuilder::new(2, 0).build(),
    ]);
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    list.no_match_found();
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
}

#[tokio::test]
async fn test_request_count_is_offered_repeatedly() {
    let mut schedd = MockSchedd::new(vec![
        JobBuilder::new(1, 0).autocluster(7).count(3).build(),
        JobBuilder::new(2, 0).autocluster(8).build(),
    ]);
    let mut list = batched(10);

    for remaining in [2, 1, 0] {
        assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
        assert_eq!(list.remaining_offers(), remaining);
    }
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert_eq!(list.round_trips(), 1);
}

#[tokio::test]
async fn test_no_match_truncates_remaining_offers() {
    let mut schedd = MockSchedd::new(vec![
        JobBuilder::new(1, 0).autocluster(7).count(5).build(),
        JobBuilder::new(2, 0).autocluster(7).build(),
        JobBuilder::new(3, 0).autocluster(8).build(),
    ]);
    let mut list = batched(10);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    list.no_match_found();
    assert_eq!(list.remaining_offers(), 0);
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(3));
}

#[tokio::test]
async fn test_counts_disabled() {
    let mut schedd = MockSchedd::new(vec![
        JobBuilder::new(1, 0).autocluster(7).count(3).build(),
        JobBuilder::new(2, 0).autocluster(7).build(),
    ]);
    let mut list = ResourceRequestList::new(1);
    list.configure(200, false);
    assert!(list.is_legacy());

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert_eq!(schedd.sent(), vec![ToScheddMessage::SendJobInfo; 3]);
}

#[tokio::test]
async fn test_legacy_one_round_trip_per_request() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 1, 2]));
    let mut list = batched(1);
    assert!(list.is_legacy());

    for expected in 1..=3 {
        assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(expected));
        assert_eq!(schedd.request_count(), expected as usize);
        // One-at-a-time mode does not track rejected autoclusters
        list.no_match_found();
    }
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert_eq!(schedd.sent(), vec![ToScheddMessage::SendJobInfo; 4]);
}

#[tokio::test]
async fn test_old_protocol_forces_legacy() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1]));
    let mut list = ResourceRequestList::new(0);
    list.configure(200, true);
    assert!(list.is_legacy());
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(schedd.sent(), &[ToScheddMessage::SendJobInfo]);
}

#[tokio::test]
async fn test_empty_schedd_is_not_an_error() {
    let mut schedd = MockSchedd::new(vec![]);
    let mut list = batched(5);
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert!(!list.had_error());
    assert_eq!(list.error_code(), None);
    assert!(!list.needs_end_negotiate());
}

#[tokio::test]
async fn test_clear_rejected_applies_on_next_fetch() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 1, 1, 1]));
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    list.no_match_found();
    list.clear_rejected_autoclusters();
    // Job 2 was fetched before the clear took effect
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(3));
    assert!(!list.is_rejected(AutoclusterId::new(1)));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(4));
}

#[tokio::test]
async fn test_send_failure() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1])).fail_sends_after(0);
    let mut list = batched(5);
    assert!(list.get_request(&mut schedd).await.is_err());
    assert!(list.had_error());
    assert_eq!(list.error_code(), Some(FetchErrorKind::SendFailed));
    // The session stays failed
    assert!(list.get_request(&mut schedd).await.is_err());
}

#[tokio::test]
async fn test_connection_lost_during_batch() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 2, 3])).drop_after_replies(1);
    let mut list = batched(3);
    assert!(list.get_request(&mut schedd).await.is_err());
    assert_eq!(list.error_code(), Some(FetchErrorKind::ReceiveFailed));
}

#[tokio::test]
async fn test_malformed_request() {
    let mut schedd = MockSchedd::new(vec![
        JobBuilder::new(1, 0).build(),
        JobBuilder::new(2, 0).without("ProcId").build(),
    ]);
    let mut list = batched(5);
    assert!(list.get_request(&mut schedd).await.is_err());
    assert_eq!(list.error_code(), Some(FetchErrorKind::MalformedRequest));
}

#[tokio::test]
async fn test_prefetch() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 2]));
    let mut list = batched(2);

    assert_eq!(
        list.prefetch(&mut schedd).await.unwrap(),
        PrefetchStatus::Fetched(2)
    );
    assert_eq!(list.pending_count(), 2);
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
    assert_eq!(list.round_trips(), 1);

    assert_eq!(
        list.prefetch(&mut schedd).await.unwrap(),
        PrefetchStatus::NoMoreJobs
    );
    assert_eq!(
        list.prefetch(&mut schedd).await.unwrap(),
        PrefetchStatus::NoMoreJobs
    );
    assert_eq!(list.round_trips(), 2);
}

#[tokio::test]
async fn test_end_negotiate() {
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1, 2, 3, 4]));
    let mut list = batched(2);

    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert!(list.needs_end_negotiate());
    list.end_negotiate(&mut schedd).await.unwrap();
    assert!(!list.needs_end_negotiate());
    assert_eq!(schedd.sent().last(), Some(&ToScheddMessage::EndNegotiate));

    // Already fetched requests are still served, nothing more is fetched
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(2));
    assert_eq!(next_cluster(&mut list, &mut schedd).await, None);
    assert_eq!(schedd.request_count(), 1);
}

#[tokio::test]
async fn test_from_config() {
    let mut params = ParamTable::new();
    params.set("NEGOTIATOR_RESOURCE_REQUEST_LIST_SIZE", "5");
    let mut schedd = MockSchedd::new(jobs_in_autoclusters(&[1]));
    let mut list = ResourceRequestList::from_config(&params, 1);
    assert!(!list.is_legacy());
    assert_eq!(next_cluster(&mut list, &mut schedd).await, Some(1));
    assert_eq!(
        schedd.sent(),
        &[ToScheddMessage::SendResourceRequestList { count: 5 }]
    );

    params.set("USE_RESOURCE_REQUEST_COUNTS", "false");
    assert!(ResourceRequestList::from_config(&params, 1).is_legacy());

    let defaults = ResourceRequestList::from_config(&ParamTable::new(), 1);
    assert!(!defaults.is_legacy());
}
