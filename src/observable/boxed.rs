use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  subscription::BoxSubscription,
};

type Subscribe<Item, Err> = Box<dyn FnOnce(BoxObserver<Item, Err>) -> BoxSubscription + Send>;

/// An observable with its concrete type erased, created by
/// [`ObservableExt::box_it`].
///
/// Boxing costs one allocation for the source and one for each observer.
pub struct BoxOp<Item, Err>(Subscribe<Item, Err>);

impl<Item, Err> BoxOp<Item, Err> {
  pub(crate) fn new<S>(source: S) -> Self
  where
    S: Observable<Item, Err, BoxObserver<Item, Err>> + Send + 'static,
    S::Unsub: Send + 'static,
  {
    BoxOp(Box::new(move |observer| BoxSubscription::new(source.actual_subscribe(observer))))
  }
}

impl<Item, Err, O> Observable<Item, Err, O> for BoxOp<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub { (self.0)(Box::new(observer)) }
}

impl<Item, Err> ObservableExt<Item, Err> for BoxOp<Item, Err> {}
